//! Command-line interface definitions and argument parsing

use clap::Parser;
use std::path::PathBuf;

use crate::config::{parse_reference_date, MissingFieldPolicy, PipelineConfig};
use crate::segment::Segment;

/// Customer segmentation CLI using quantile-based RFM scoring
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file
    #[arg(short, long, default_value = "data.csv")]
    pub input: String,

    /// Reference date for recency, "YYYY-MM-DD" or "YYYY-MM-DDTHH:MM:SS".
    /// Defaults to one day after the latest invoice
    #[arg(short, long)]
    pub reference_date: Option<String>,

    /// Write the segmented table to the output file
    #[arg(short, long)]
    pub export: bool,

    /// Output path for the exported table
    #[arg(short, long, default_value = "rfm.csv")]
    pub output: String,

    /// Only export customers in this segment, e.g. "new_customers"
    #[arg(short, long)]
    pub segment: Option<String>,

    /// Fail on rows with a missing invoice, quantity, price or date instead of dropping them
    #[arg(long)]
    pub strict: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Build the pipeline configuration from the parsed flags
    pub fn to_config(&self) -> anyhow::Result<PipelineConfig> {
        let reference_date = match self.reference_date {
            Some(ref raw) => Some(
                parse_reference_date(raw)
                    .ok_or_else(|| anyhow::anyhow!("Invalid reference date: {}", raw))?,
            ),
            None => None,
        };

        let segment_filter = match self.segment {
            Some(ref raw) => Some(raw.parse::<Segment>().map_err(anyhow::Error::msg)?),
            None => None,
        };

        if segment_filter.is_some() && !self.export {
            anyhow::bail!("--segment only applies together with --export");
        }

        Ok(PipelineConfig {
            reference_date,
            export: self.export,
            export_path: PathBuf::from(&self.output),
            missing_fields: if self.strict {
                MissingFieldPolicy::Reject
            } else {
                MissingFieldPolicy::Drop
            },
            segment_filter,
        })
    }
}
