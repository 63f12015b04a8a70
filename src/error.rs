//! Error taxonomy for the RFM pipeline

use crate::data::{Field, Metric, Stage};
use thiserror::Error;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, RfmError>;

#[derive(Debug, Error)]
pub enum RfmError {
    /// A required field is absent. `row` is `None` when the whole column is missing.
    #[error("{stage}: missing required field `{field}`{}", row_suffix(.row))]
    MissingField {
        stage: Stage,
        field: Field,
        row: Option<usize>,
    },

    #[error("{stage}: cannot parse `{field}` value {value:?} at row {row}")]
    InvalidField {
        stage: Stage,
        field: Field,
        row: usize,
        value: String,
    },

    #[error(
        "{stage}: column `{metric}` cannot be split into 5 quantile buckets \
         (edges {edges:?} are not distinct)"
    )]
    DegenerateDistribution {
        stage: Stage,
        metric: Metric,
        edges: Vec<f64>,
    },

    #[error("{stage}: no customers remain")]
    EmptyResult { stage: Stage },

    #[error("{stage}: score pair ({recency_score}, {frequency_score}) matches no segment rule")]
    UnclassifiedSegment {
        stage: Stage,
        recency_score: u8,
        frequency_score: u8,
    },

    #[error(transparent)]
    Polars(#[from] polars::prelude::PolarsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn row_suffix(row: &Option<usize>) -> String {
    match row {
        Some(row) => format!(" at row {}", row),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_stage_and_column() {
        let err = RfmError::MissingField {
            stage: Stage::Clean,
            field: Field::Quantity,
            row: Some(7),
        };
        assert_eq!(
            err.to_string(),
            "clean: missing required field `Quantity` at row 7"
        );

        let err = RfmError::DegenerateDistribution {
            stage: Stage::Score,
            metric: Metric::Recency,
            edges: vec![1.0, 1.0, 1.0, 2.0, 3.0, 4.0],
        };
        assert!(err.to_string().starts_with("score: column `recency`"));
    }
}
