//! End-to-end RFM run: clean, aggregate, score, classify, optionally export

use chrono::NaiveDateTime;
use log::info;
use std::collections::BTreeMap;

use crate::clean::clean_records;
use crate::config::PipelineConfig;
use crate::data::{ScoredCustomer, SegmentedCustomer, Stage};
use crate::error::{Result, RfmError};
use crate::export::{CsvSink, SegmentSink};
use crate::metrics::{aggregate, default_reference_date};
use crate::score::score_customers;
use crate::segment::{classify, Segment};
use crate::source::TransactionSource;

/// Result of one pipeline run, ordered by customer id
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentTable {
    pub reference_date: NaiveDateTime,
    pub scored: Vec<ScoredCustomer>,
    pub rows: Vec<SegmentedCustomer>,
}

impl SegmentTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn in_segment(&self, segment: Segment) -> Vec<SegmentedCustomer> {
        self.rows
            .iter()
            .filter(|row| row.segment == segment)
            .cloned()
            .collect()
    }

    /// Customers per segment; segments without customers are omitted
    pub fn segment_counts(&self) -> BTreeMap<Segment, usize> {
        let mut counts = BTreeMap::new();
        for row in &self.rows {
            *counts.entry(row.segment).or_insert(0) += 1;
        }
        counts
    }
}

/// Run the whole pipeline over `source`.
///
/// Any error aborts the run; no partial table is returned. When
/// `config.export` is set the table (or the filtered segment) is also
/// written to `config.export_path`.
pub fn run(source: &impl TransactionSource, config: &PipelineConfig) -> Result<SegmentTable> {
    let table = build_table(source, config)?;

    if config.export {
        let rows = match config.segment_filter {
            Some(segment) => table.in_segment(segment),
            None => table.rows.clone(),
        };
        CsvSink::new(&config.export_path).write(&rows)?;
    }

    Ok(table)
}

fn build_table(source: &impl TransactionSource, config: &PipelineConfig) -> Result<SegmentTable> {
    let lines = source.transactions()?;
    let cleaned = clean_records(&lines, config.missing_fields)?;

    let reference_date = config
        .reference_date
        .or_else(|| default_reference_date(&cleaned))
        .ok_or(RfmError::EmptyResult { stage: Stage::Clean })?;
    info!(
        "Scoring {} clean lines against reference date {}",
        cleaned.len(),
        reference_date
    );

    let metrics = aggregate(&cleaned, reference_date)?;
    let scored = score_customers(metrics)?;

    let rows = scored
        .iter()
        .map(|customer| {
            Ok(SegmentedCustomer {
                customer_id: customer.metrics.customer_id.clone(),
                recency: customer.metrics.recency,
                frequency: customer.metrics.frequency,
                monetary: customer.metrics.monetary,
                segment: classify(customer.rfm_key)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    info!("Segmented {} customers", rows.len());

    Ok(SegmentTable {
        reference_date,
        scored,
        rows,
    })
}
