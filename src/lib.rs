//! RfmForge: customer segmentation from invoice logs using RFM scoring
//!
//! Invoice lines are cleaned, aggregated per customer into recency,
//! frequency and monetary values, scored 1-5 by quintile and mapped onto
//! named segments from the recency and frequency scores.

pub mod clean;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod metrics;
pub mod pipeline;
pub mod score;
pub mod segment;
pub mod source;

// Re-export public items for easier access
pub use cli::Args;
pub use config::{MissingFieldPolicy, PipelineConfig};
pub use data::{CustomerId, CustomerMetrics, ScoredCustomer, SegmentedCustomer, TransactionLine};
pub use error::{Result, RfmError};
pub use export::{segment_summary, to_dataframe, CsvSink, SegmentSink};
pub use pipeline::{run, SegmentTable};
pub use segment::{classify, Segment};
pub use source::{CsvSource, TransactionSource};
