//! Output sinks for segmented customers and the per-segment summary

use log::info;
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::data::SegmentedCustomer;
use crate::error::Result;

/// Receives the finished table
pub trait SegmentSink {
    fn write(&mut self, rows: &[SegmentedCustomer]) -> Result<()>;
}

impl SegmentSink for Vec<SegmentedCustomer> {
    fn write(&mut self, rows: &[SegmentedCustomer]) -> Result<()> {
        self.extend_from_slice(rows);
        Ok(())
    }
}

/// Writes the table as a comma-separated file with a header row
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl SegmentSink for CsvSink {
    fn write(&mut self, rows: &[SegmentedCustomer]) -> Result<()> {
        let mut df = to_dataframe(rows)?;
        let mut file = File::create(&self.path)?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut df)?;

        info!("Wrote {} customers to {}", rows.len(), self.path.display());
        Ok(())
    }
}

/// Columns: customer_id, recency, frequency, monetary, segment
pub fn to_dataframe(rows: &[SegmentedCustomer]) -> Result<DataFrame> {
    let customer_ids: Vec<String> = rows.iter().map(|r| r.customer_id.to_string()).collect();
    let recency: Vec<i64> = rows.iter().map(|r| r.recency).collect();
    let frequency: Vec<u32> = rows.iter().map(|r| r.frequency).collect();
    let monetary: Vec<f64> = rows.iter().map(|r| r.monetary).collect();
    let segments: Vec<&str> = rows.iter().map(|r| r.segment.label()).collect();

    let df = DataFrame::new(vec![
        Series::new("customer_id", customer_ids),
        Series::new("recency", recency),
        Series::new("frequency", frequency),
        Series::new("monetary", monetary),
        Series::new("segment", segments),
    ])?;
    Ok(df)
}

/// Customer count and mean metrics per segment, ordered by segment label
pub fn segment_summary(rows: &[SegmentedCustomer]) -> Result<DataFrame> {
    let summary = to_dataframe(rows)?
        .lazy()
        .group_by([col("segment")])
        .agg([
            col("customer_id").count().alias("count"),
            col("recency").mean().alias("recency_mean"),
            col("frequency").mean().alias("frequency_mean"),
            col("monetary").mean().alias("monetary_mean"),
        ])
        .sort(["segment"], SortMultipleOptions::default())
        .collect()?;
    Ok(summary)
}
