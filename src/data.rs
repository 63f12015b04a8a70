//! Record types flowing through the pipeline, from raw invoice lines to segmented customers

use chrono::NaiveDateTime;
use std::fmt;

use crate::segment::Segment;

/// Customer identity. Numeric ids sort numerically and before textual ones.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CustomerId {
    Numeric(i64),
    Text(String),
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomerId::Numeric(id) => write!(f, "{}", id),
            CustomerId::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for CustomerId {
    fn from(id: i64) -> Self {
        CustomerId::Numeric(id)
    }
}

/// Whole numbers, including ones written as floats (`17850.0`), become numeric ids
impl From<&str> for CustomerId {
    fn from(id: &str) -> Self {
        let id = id.trim();
        if let Ok(numeric) = id.parse::<i64>() {
            return CustomerId::Numeric(numeric);
        }
        match id.parse::<f64>() {
            Ok(value) if value.fract() == 0.0 && value.abs() < i64::MAX as f64 => {
                CustomerId::Numeric(value as i64)
            }
            _ => CustomerId::Text(id.to_string()),
        }
    }
}

/// One invoice line as delivered by a source. Any field may be missing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransactionLine {
    pub invoice_id: Option<String>,
    pub customer_id: Option<CustomerId>,
    pub quantity: Option<i64>,
    pub unit_price: Option<f64>,
    pub invoice_timestamp: Option<NaiveDateTime>,
}

impl TransactionLine {
    /// Build a fully populated line
    pub fn new(
        invoice_id: impl Into<String>,
        customer_id: impl Into<CustomerId>,
        quantity: i64,
        unit_price: f64,
        invoice_timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            invoice_id: Some(invoice_id.into()),
            customer_id: Some(customer_id.into()),
            quantity: Some(quantity),
            unit_price: Some(unit_price),
            invoice_timestamp: Some(invoice_timestamp),
        }
    }
}

/// A line that survived cleaning, with its derived monetary value
#[derive(Debug, Clone, PartialEq)]
pub struct CleanLine {
    pub invoice_id: String,
    pub customer_id: CustomerId,
    pub quantity: i64,
    pub unit_price: f64,
    pub invoice_timestamp: NaiveDateTime,
    /// `quantity * unit_price`
    pub line_total: f64,
}

/// Per-customer recency, frequency and monetary values
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerMetrics {
    pub customer_id: CustomerId,
    /// Whole days between the reference date and the latest invoice
    pub recency: i64,
    /// Distinct invoices
    pub frequency: u32,
    /// Sum of line totals, always > 0 once aggregated
    pub monetary: f64,
}

/// Recency and frequency scores joined into the two-digit segment lookup key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RfmKey {
    pub recency_score: u8,
    pub frequency_score: u8,
}

impl fmt::Display for RfmKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.recency_score, self.frequency_score)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCustomer {
    pub metrics: CustomerMetrics,
    pub recency_score: u8,
    pub frequency_score: u8,
    pub monetary_score: u8,
    pub rfm_key: RfmKey,
}

impl ScoredCustomer {
    pub fn new(
        metrics: CustomerMetrics,
        recency_score: u8,
        frequency_score: u8,
        monetary_score: u8,
    ) -> Self {
        Self {
            metrics,
            recency_score,
            frequency_score,
            monetary_score,
            rfm_key: RfmKey {
                recency_score,
                frequency_score,
            },
        }
    }
}

/// Final output row
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentedCustomer {
    pub customer_id: CustomerId,
    pub recency: i64,
    pub frequency: u32,
    pub monetary: f64,
    pub segment: Segment,
}

/// Pipeline stage, used to locate errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Source,
    Clean,
    Aggregate,
    Score,
    Classify,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Source => "source",
            Stage::Clean => "clean",
            Stage::Aggregate => "aggregate",
            Stage::Score => "score",
            Stage::Classify => "classify",
        })
    }
}

/// Input fields a transaction line is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Invoice,
    CustomerId,
    Quantity,
    Price,
    InvoiceDate,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Invoice,
        Field::CustomerId,
        Field::Quantity,
        Field::Price,
        Field::InvoiceDate,
    ];

    /// Canonical column header
    pub fn column_name(&self) -> &'static str {
        match self {
            Field::Invoice => "Invoice",
            Field::CustomerId => "Customer ID",
            Field::Quantity => "Quantity",
            Field::Price => "Price",
            Field::InvoiceDate => "InvoiceDate",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Recency,
    Frequency,
    Monetary,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Metric::Recency => "recency",
            Metric::Frequency => "frequency",
            Metric::Monetary => "monetary",
        })
    }
}
