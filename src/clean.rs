//! Record cleaning: drops anonymous and cancelled lines and derives line totals

use log::{debug, warn};

use crate::config::MissingFieldPolicy;
use crate::data::{CleanLine, Field, Stage, TransactionLine};
use crate::error::{Result, RfmError};

/// Marks a cancelled or reversed invoice wherever it appears in the id
pub const CANCELLATION_MARKER: char = 'C';

pub fn is_cancellation(invoice_id: &str) -> bool {
    invoice_id.contains(CANCELLATION_MARKER)
}

/// Keep lines with a customer, a non-cancelled invoice and every field
/// aggregation needs. Input is left untouched.
pub fn clean_records(lines: &[TransactionLine], policy: MissingFieldPolicy) -> Result<Vec<CleanLine>> {
    let mut cleaned = Vec::with_capacity(lines.len());
    let mut anonymous = 0usize;
    let mut incomplete = 0usize;
    let mut cancelled = 0usize;

    for (row, line) in lines.iter().enumerate() {
        let Some(customer_id) = line.customer_id.clone() else {
            anonymous += 1;
            continue;
        };

        let fields = (
            line.invoice_id.as_deref(),
            line.quantity,
            line.unit_price,
            line.invoice_timestamp,
        );
        let (invoice_id, quantity, unit_price, invoice_timestamp) = match fields {
            (Some(invoice), Some(quantity), Some(price), Some(timestamp)) => {
                (invoice, quantity, price, timestamp)
            }
            _ => {
                if policy == MissingFieldPolicy::Reject {
                    return Err(RfmError::MissingField {
                        stage: Stage::Clean,
                        field: first_missing(line),
                        row: Some(row),
                    });
                }
                incomplete += 1;
                continue;
            }
        };

        if is_cancellation(invoice_id) {
            cancelled += 1;
            continue;
        }

        cleaned.push(CleanLine {
            invoice_id: invoice_id.to_string(),
            customer_id,
            quantity,
            unit_price,
            invoice_timestamp,
            line_total: quantity as f64 * unit_price,
        });
    }

    if incomplete > 0 {
        warn!("Dropped {} lines with missing fields", incomplete);
    }
    debug!(
        "Cleaned {} lines: kept {}, anonymous {}, cancelled {}",
        lines.len(),
        cleaned.len(),
        anonymous,
        cancelled
    );

    Ok(cleaned)
}

fn first_missing(line: &TransactionLine) -> Field {
    if line.invoice_id.is_none() {
        Field::Invoice
    } else if line.quantity.is_none() {
        Field::Quantity
    } else if line.unit_price.is_none() {
        Field::Price
    } else {
        Field::InvoiceDate
    }
}
