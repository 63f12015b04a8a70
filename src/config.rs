//! Pipeline configuration passed explicitly into [`crate::pipeline::run`]

use chrono::{NaiveDate, NaiveDateTime};
use std::path::PathBuf;

use crate::segment::Segment;

/// What the cleaner does with a row whose invoice, quantity, price or
/// timestamp is missing. Rows without a customer id are always dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingFieldPolicy {
    #[default]
    Drop,
    Reject,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Point in time recency is measured from. Defaults to one day after
    /// the latest cleaned invoice.
    pub reference_date: Option<NaiveDateTime>,
    /// Persist the output table through the CSV sink
    pub export: bool,
    pub export_path: PathBuf,
    pub missing_fields: MissingFieldPolicy,
    /// Only export customers in this segment
    pub segment_filter: Option<Segment>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            reference_date: None,
            export: false,
            export_path: PathBuf::from("rfm.csv"),
            missing_fields: MissingFieldPolicy::default(),
            segment_filter: None,
        }
    }
}

impl PipelineConfig {
    pub fn with_reference_date(mut self, reference_date: NaiveDateTime) -> Self {
        self.reference_date = Some(reference_date);
        self
    }
}

/// Parse `YYYY-MM-DD` (midnight) or `YYYY-MM-DDTHH:MM:SS`
pub fn parse_reference_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.reference_date, None);
        assert!(!config.export);
        assert_eq!(config.export_path, PathBuf::from("rfm.csv"));
        assert_eq!(config.missing_fields, MissingFieldPolicy::Drop);
    }

    #[test]
    fn test_parse_reference_date() {
        let midnight = NaiveDate::from_ymd_opt(2011, 12, 11)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(parse_reference_date("2011-12-11"), Some(midnight));
        assert_eq!(parse_reference_date("2011-12-11T00:00:00"), Some(midnight));
        assert_eq!(parse_reference_date("11/12/2011"), None);
    }
}
