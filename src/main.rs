//! RfmForge: customer segmentation CLI using RFM quantile scoring
//!
//! This is the main entrypoint that wires logging, data loading, the
//! segmentation pipeline, the segment report and the optional export.

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use rfmforge::{pipeline, segment_summary, Args, CsvSource};
use std::time::Instant;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();
    configure_logging(args.verbose);

    let config = args.to_config()?;

    if args.verbose {
        println!("RfmForge - Customer Segmentation using RFM scores");
        println!("=================================================\n");
    }

    println!("=== RFM Segmentation Pipeline ===\n");
    let start_time = Instant::now();

    if args.verbose {
        println!("Input file: {}", args.input);
        match config.reference_date {
            Some(date) => println!("Reference date: {}", date),
            None => println!("Reference date: one day after the latest invoice"),
        }
    }

    let source = CsvSource::new(&args.input);
    let table = pipeline::run(&source, &config)
        .with_context(|| format!("Segmentation of {} failed", args.input))?;

    println!("✓ Segmented {} customers", table.len());
    if args.verbose {
        println!("  Reference date used: {}", table.reference_date);
    }

    // Segment statistics
    println!("\n=== Segment Statistics ===");
    for (segment, size) in table.segment_counts() {
        let percentage = (size as f64 / table.len() as f64) * 100.0;
        println!("{:<20} {:>6} customers ({:.1}%)", segment.label(), size, percentage);
    }

    if args.verbose {
        let summary = segment_summary(&table.rows)?;
        println!("\n{}", summary);
    }

    if config.export {
        println!("\n✓ Table exported to: {}", config.export_path.display());
        if let Some(segment) = config.segment_filter {
            println!("  Restricted to segment: {}", segment);
        }
    }

    let total_time = start_time.elapsed();
    println!("\n=== Pipeline Complete ===");
    println!("Total processing time: {:.2}s", total_time.as_secs_f64());

    Ok(())
}

/// `--verbose` lowers the default level to debug; `RUST_LOG` still wins
fn configure_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}
