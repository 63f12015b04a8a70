//! Quantile scoring of recency, frequency and monetary columns
//!
//! Each column is cut into five equal-population buckets using edges taken
//! over the whole customer collection. Edges are interpolated linearly
//! between order statistics, bins are closed on the right, and the lowest
//! edge belongs to the first bin. A column whose edges are not strictly
//! increasing cannot be cut and is reported as degenerate.

use log::debug;

use crate::data::{CustomerMetrics, Metric, ScoredCustomer, Stage};
use crate::error::{Result, RfmError};

/// Number of ordinal scores, `1..=SCORE_BUCKETS`
pub const SCORE_BUCKETS: usize = 5;

/// 1-based ranks where equal values are ordered by position
pub fn ordinal_rank(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    // stable sort keeps encounter order among ties
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    for (rank, index) in order.into_iter().enumerate() {
        ranks[index] = (rank + 1) as f64;
    }
    ranks
}

/// `buckets + 1` quantile edges from the minimum to the maximum
pub fn quantile_edges(values: &[f64], buckets: usize) -> Vec<f64> {
    if values.is_empty() || buckets == 0 {
        return Vec::new();
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let last = (sorted.len() - 1) as f64;

    (0..=buckets)
        .map(|i| {
            let position = last * i as f64 / buckets as f64;
            let lower = position.floor() as usize;
            let upper = position.ceil() as usize;
            sorted[lower] + (sorted[upper] - sorted[lower]) * (position - lower as f64)
        })
        .collect()
}

/// Zero-based bucket index for every value
pub fn qcut(values: &[f64], metric: Metric) -> Result<Vec<usize>> {
    let edges = quantile_edges(values, SCORE_BUCKETS);
    let distinct = edges.len() == SCORE_BUCKETS + 1 && edges.windows(2).all(|pair| pair[0] < pair[1]);
    if !distinct {
        return Err(RfmError::DegenerateDistribution {
            stage: Stage::Score,
            metric,
            edges,
        });
    }

    debug!("{} quantile edges: {:?}", metric, edges);

    let inner = &edges[1..SCORE_BUCKETS];
    Ok(values
        .iter()
        .map(|&value| inner.partition_point(|&edge| edge < value))
        .collect())
}

/// Score every customer. Recent customers score high; frequent and
/// high-spending customers score high. Frequency is ranked first so that
/// large groups of equal counts can still be split.
pub fn score_customers(metrics: Vec<CustomerMetrics>) -> Result<Vec<ScoredCustomer>> {
    let recency: Vec<f64> = metrics.iter().map(|m| m.recency as f64).collect();
    let frequency: Vec<f64> = metrics.iter().map(|m| f64::from(m.frequency)).collect();
    let monetary: Vec<f64> = metrics.iter().map(|m| m.monetary).collect();

    let recency_buckets = qcut(&recency, Metric::Recency)?;
    let frequency_buckets = qcut(&ordinal_rank(&frequency), Metric::Frequency)?;
    let monetary_buckets = qcut(&monetary, Metric::Monetary)?;

    Ok(metrics
        .into_iter()
        .enumerate()
        .map(|(i, m)| {
            ScoredCustomer::new(
                m,
                (SCORE_BUCKETS - recency_buckets[i]) as u8,
                (frequency_buckets[i] + 1) as u8,
                (monetary_buckets[i] + 1) as u8,
            )
        })
        .collect())
}
