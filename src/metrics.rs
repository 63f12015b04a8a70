//! Per-customer recency, frequency and monetary aggregation

use chrono::{Duration, NaiveDateTime};
use log::{debug, warn};
use polars::prelude::*;

use crate::data::{CleanLine, CustomerId, CustomerMetrics, Stage};
use crate::error::{Result, RfmError};

const SECONDS_PER_DAY: i64 = 86_400;

/// One day after the latest invoice, or `None` for an empty input
pub fn default_reference_date(lines: &[CleanLine]) -> Option<NaiveDateTime> {
    lines
        .iter()
        .map(|line| line.invoice_timestamp)
        .max()
        .map(|latest| latest + Duration::days(1))
}

/// Whole days from `latest` to `reference_date`, rounded down
pub fn floor_days(reference_date: NaiveDateTime, latest: NaiveDateTime) -> i64 {
    days_from_seconds((reference_date - latest).num_seconds())
}

/// Group cleaned lines by customer and reduce each group to its metrics.
///
/// Customers whose total spend is not positive are dropped. The result is
/// ordered by customer id.
pub fn aggregate(lines: &[CleanLine], reference_date: NaiveDateTime) -> Result<Vec<CustomerMetrics>> {
    // Customers are grouped on their position in sorted id order
    let mut customers: Vec<&CustomerId> = lines.iter().map(|line| &line.customer_id).collect();
    customers.sort();
    customers.dedup();

    let keys: Vec<u32> = lines
        .iter()
        .map(|line| customer_key(&customers, &line.customer_id))
        .collect();
    let invoices: Vec<&str> = lines.iter().map(|line| line.invoice_id.as_str()).collect();
    let timestamps: Vec<i64> = lines
        .iter()
        .map(|line| line.invoice_timestamp.and_utc().timestamp())
        .collect();
    let totals: Vec<f64> = lines.iter().map(|line| line.line_total).collect();

    let df = DataFrame::new(vec![
        Series::new("customer_key", keys),
        Series::new("invoice_id", invoices),
        Series::new("invoice_timestamp", timestamps),
        Series::new("line_total", totals),
    ])?;

    let rfm_df = df
        .lazy()
        .group_by([col("customer_key")])
        .agg([
            // Latest purchase, in seconds since the epoch
            col("invoice_timestamp").max().alias("last_purchase"),
            // Frequency: number of unique invoices
            col("invoice_id").n_unique().alias("frequency"),
            // Monetary: total spending
            col("line_total").sum().alias("monetary"),
        ])
        .filter(col("monetary").gt(lit(0.0)))
        .sort(["customer_key"], SortMultipleOptions::default())
        .collect()?;

    let keys = rfm_df.column("customer_key")?.cast(&DataType::UInt32)?;
    let last_purchases = rfm_df.column("last_purchase")?.cast(&DataType::Int64)?;
    let frequencies = rfm_df.column("frequency")?.cast(&DataType::UInt32)?;
    let monetary = rfm_df.column("monetary")?.cast(&DataType::Float64)?;

    let reference_secs = reference_date.and_utc().timestamp();
    let metrics: Vec<CustomerMetrics> = keys
        .u32()?
        .into_no_null_iter()
        .zip(last_purchases.i64()?.into_no_null_iter())
        .zip(frequencies.u32()?.into_no_null_iter())
        .zip(monetary.f64()?.into_no_null_iter())
        .map(|(((key, last_purchase), frequency), monetary)| CustomerMetrics {
            customer_id: customers[key as usize].clone(),
            recency: days_from_seconds(reference_secs - last_purchase),
            frequency,
            monetary,
        })
        .collect();

    debug!(
        "Aggregated {} customers, {} with positive spend",
        customers.len(),
        metrics.len()
    );

    let negative = metrics.iter().filter(|m| m.recency < 0).count();
    if negative > 0 {
        warn!(
            "Reference date {} precedes the last invoice of {} customers",
            reference_date, negative
        );
    }

    if metrics.is_empty() {
        return Err(RfmError::EmptyResult {
            stage: Stage::Aggregate,
        });
    }

    Ok(metrics)
}

fn customer_key(customers: &[&CustomerId], id: &CustomerId) -> u32 {
    customers.partition_point(|candidate| *candidate < id) as u32
}

fn days_from_seconds(seconds: i64) -> i64 {
    seconds.div_euclid(SECONDS_PER_DAY)
}
