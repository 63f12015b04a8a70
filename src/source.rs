//! Transaction sources: CSV loading with Polars and in-memory records

use chrono::{DateTime, NaiveDateTime};
use log::info;
use polars::prelude::*;
use std::path::{Path, PathBuf};

use crate::data::{CustomerId, Field, Stage, TransactionLine};
use crate::error::{Result, RfmError};

const TIMESTAMP_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M",
];

/// Anything that can hand the pipeline a fully materialised set of invoice lines
pub trait TransactionSource {
    fn transactions(&self) -> Result<Vec<TransactionLine>>;
}

impl TransactionSource for Vec<TransactionLine> {
    fn transactions(&self) -> Result<Vec<TransactionLine>> {
        Ok(self.clone())
    }
}

/// Invoice export in CSV form, one line item per row
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TransactionSource for CsvSource {
    fn transactions(&self) -> Result<Vec<TransactionLine>> {
        // Full-file inference: cancelled invoice ids may only appear late in the file
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(None)
            .try_into_reader_with_file_path(Some(self.path.clone()))?
            .finish()?;

        info!("Read {} rows from {}", df.height(), self.path().display());
        lines_from_frame(&df)
    }
}

/// Header names accepted for each field, canonical name first
pub fn column_aliases(field: Field) -> &'static [&'static str] {
    match field {
        Field::Invoice => &["Invoice", "InvoiceNo"],
        Field::CustomerId => &["Customer ID", "CustomerID"],
        Field::Quantity => &["Quantity"],
        Field::Price => &["Price", "UnitPrice"],
        Field::InvoiceDate => &["InvoiceDate"],
    }
}

fn resolve_column(df: &DataFrame, field: Field) -> Result<&Series> {
    let names = df.get_column_names();
    let name = column_aliases(field)
        .iter()
        .find(|alias| names.contains(alias))
        .ok_or(RfmError::MissingField {
            stage: Stage::Source,
            field,
            row: None,
        })?;
    Ok(df.column(name)?)
}

/// Map a frame with the invoice columns onto transaction lines
pub fn lines_from_frame(df: &DataFrame) -> Result<Vec<TransactionLine>> {
    for field in Field::ALL {
        resolve_column(df, field)?;
    }

    let invoices = resolve_column(df, Field::Invoice)?.cast(&DataType::String)?;
    let customers = customer_ids(resolve_column(df, Field::CustomerId)?)?;
    let quantities = quantity_values(resolve_column(df, Field::Quantity)?)?;
    let prices = numeric_values(resolve_column(df, Field::Price)?, Field::Price)?;
    let dates = resolve_column(df, Field::InvoiceDate)?.cast(&DataType::String)?;

    let invoices = invoices.str()?;
    let dates = dates.str()?;

    let mut lines = Vec::with_capacity(df.height());
    for (row, customer_id) in customers.into_iter().enumerate() {
        let invoice_timestamp = match dates.get(row) {
            Some(raw) => Some(
                parse_timestamp(raw).ok_or_else(|| invalid_value(Field::InvoiceDate, row, raw))?,
            ),
            None => None,
        };

        lines.push(TransactionLine {
            invoice_id: invoices.get(row).map(|id| id.trim().to_string()),
            customer_id,
            quantity: quantities[row],
            unit_price: prices[row],
            invoice_timestamp,
        });
    }

    Ok(lines)
}

/// Numeric column as floats. A present value that does not parse is an error,
/// not a null.
fn numeric_values(series: &Series, field: Field) -> Result<Vec<Option<f64>>> {
    let raw = series.cast(&DataType::String)?;
    let values = series.cast(&DataType::Float64)?;

    raw.str()?
        .into_iter()
        .zip(values.f64()?.into_iter())
        .enumerate()
        .map(|(row, (text, value))| match (text, value) {
            (None, _) => Ok(None),
            (Some(_), Some(value)) => Ok(Some(value)),
            (Some(text), None) => Err(invalid_value(field, row, text)),
        })
        .collect()
}

/// Quantities must be whole numbers; `1.5` is rejected rather than truncated
fn quantity_values(series: &Series) -> Result<Vec<Option<i64>>> {
    let values = numeric_values(series, Field::Quantity)?;
    values
        .into_iter()
        .enumerate()
        .map(|(row, value)| match value {
            Some(quantity) if quantity.fract() != 0.0 || !quantity.is_finite() => {
                Err(invalid_value(Field::Quantity, row, &quantity.to_string()))
            }
            Some(quantity) => Ok(Some(quantity as i64)),
            None => Ok(None),
        })
        .collect()
}

fn invalid_value(field: Field, row: usize, value: &str) -> RfmError {
    RfmError::InvalidField {
        stage: Stage::Source,
        field,
        row,
        value: value.to_string(),
    }
}

/// Numeric ids (often read as floats) are normalised to integers
fn customer_ids(series: &Series) -> Result<Vec<Option<CustomerId>>> {
    if series.dtype().is_numeric() {
        let ids = series.cast(&DataType::Int64)?;
        Ok(ids.i64()?.into_iter().map(|id| id.map(CustomerId::Numeric)).collect())
    } else {
        let ids = series.cast(&DataType::String)?;
        Ok(ids
            .str()?
            .into_iter()
            .map(|id| id.filter(|id| !id.trim().is_empty()).map(CustomerId::from))
            .collect())
    }
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.naive_utc())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv(header: &str, rows: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", header).unwrap();
        for row in rows {
            writeln!(file, "{}", row).unwrap();
        }
        file
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2010, 12, 1)
            .unwrap()
            .and_hms_opt(8, 26, 0)
            .unwrap();
        for raw in [
            "2010-12-01 08:26:00",
            "2010-12-01T08:26:00",
            "2010-12-01T08:26:00Z",
            "2010-12-01 08:26",
            "12/01/2010 08:26",
            "2010-12-01 08:26:00.000000",
        ] {
            assert_eq!(parse_timestamp(raw), Some(expected), "{}", raw);
        }
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_reads_canonical_headers() {
        let file = create_test_csv(
            "Invoice,StockCode,Description,Quantity,InvoiceDate,Price,Customer ID,Country",
            &[
                "489434,85048,15CM CHRISTMAS GLASS BALL 20 LIGHTS,12,2009-12-01 07:45:00,6.95,13085.0,United Kingdom",
                "C489449,22087,PAPER BUNTING WHITE LACE,-12,2009-12-01 10:33:00,2.95,16321.0,Australia",
                "489435,22350,CAT BOWL ,12,2009-12-01 07:46:00,2.55,,United Kingdom",
            ],
        );
        let lines = CsvSource::new(file.path()).transactions().unwrap();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].invoice_id.as_deref(), Some("489434"));
        assert_eq!(lines[0].customer_id, Some(CustomerId::Numeric(13085)));
        assert_eq!(lines[0].quantity, Some(12));
        assert_eq!(lines[0].unit_price, Some(6.95));
        assert_eq!(lines[1].invoice_id.as_deref(), Some("C489449"));
        assert_eq!(lines[1].quantity, Some(-12));
        assert_eq!(lines[2].customer_id, None);
    }

    #[test]
    fn test_reads_legacy_headers() {
        let file = create_test_csv(
            "InvoiceNo,StockCode,Description,Quantity,InvoiceDate,UnitPrice,CustomerID,Country",
            &["536365,85123A,WHITE HANGING HEART T-LIGHT HOLDER,6,2010-12-01T08:26:00Z,2.55,17850,United Kingdom"],
        );
        let lines = CsvSource::new(file.path()).transactions().unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].customer_id, Some(CustomerId::Numeric(17850)));
        assert_eq!(lines[0].unit_price, Some(2.55));
    }

    #[test]
    fn test_missing_column_is_reported() {
        let file = create_test_csv(
            "Invoice,Quantity,InvoiceDate,Customer ID",
            &["489434,12,2009-12-01 07:45:00,13085"],
        );
        let err = CsvSource::new(file.path()).transactions().unwrap_err();
        assert!(matches!(
            err,
            RfmError::MissingField {
                stage: Stage::Source,
                field: Field::Price,
                row: None,
            }
        ));
    }

    #[test]
    fn test_bad_timestamp_is_reported() {
        let file = create_test_csv(
            "Invoice,Quantity,InvoiceDate,Price,Customer ID",
            &["489434,12,2009-12-01 07:45:00,1.0,13085", "489435,1,not a date,1.0,13085"],
        );
        let err = CsvSource::new(file.path()).transactions().unwrap_err();
        assert!(matches!(
            err,
            RfmError::InvalidField {
                field: Field::InvoiceDate,
                row: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_mixed_customer_id_column() {
        let file = create_test_csv(
            "Invoice,Quantity,InvoiceDate,Price,Customer ID",
            &[
                "489434,1,2009-12-01 07:45:00,1.0,17850.0",
                "489435,1,2009-12-01 07:46:00,1.0,17850",
                "489436,1,2009-12-01 07:47:00,1.0,GUEST",
            ],
        );
        let lines = CsvSource::new(file.path()).transactions().unwrap();
        let ids: Vec<Option<CustomerId>> = lines.into_iter().map(|line| line.customer_id).collect();

        assert_eq!(ids[0], Some(CustomerId::Numeric(17850)));
        assert_eq!(ids[0], ids[1]);
        assert_eq!(ids[2], Some(CustomerId::Text("GUEST".to_string())));
    }

    #[test]
    fn test_fractional_quantity_is_reported() {
        let file = create_test_csv(
            "Invoice,Quantity,InvoiceDate,Price,Customer ID",
            &[
                "489434,1.5,2009-12-01 07:45:00,1.0,17850",
                "489435,2,2009-12-01 07:46:00,2.0,17850",
            ],
        );
        let err = CsvSource::new(file.path()).transactions().unwrap_err();
        match err {
            RfmError::InvalidField {
                stage, field, row, value,
            } => {
                assert_eq!(stage, Stage::Source);
                assert_eq!(field, Field::Quantity);
                assert_eq!(row, 0);
                assert_eq!(value, "1.5");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_unparseable_price_is_reported() {
        let file = create_test_csv(
            "Invoice,Quantity,InvoiceDate,Price,Customer ID",
            &[
                "489434,1,2009-12-01 07:45:00,abc,17850",
                "489435,2,2009-12-01 07:46:00,2.0,17850",
            ],
        );
        let err = CsvSource::new(file.path()).transactions().unwrap_err();
        match err {
            RfmError::InvalidField {
                field, row, value, ..
            } => {
                assert_eq!(field, Field::Price);
                assert_eq!(row, 0);
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_empty_numeric_cells_stay_missing() {
        let file = create_test_csv(
            "Invoice,Quantity,InvoiceDate,Price,Customer ID",
            &[
                "489434,,2009-12-01 07:45:00,1.0,17850",
                "489435,2,2009-12-01 07:46:00,,17850",
            ],
        );
        let lines = CsvSource::new(file.path()).transactions().unwrap();
        assert_eq!(lines[0].quantity, None);
        assert_eq!(lines[1].quantity, Some(2));
        assert_eq!(lines[1].unit_price, None);
    }

    #[test]
    fn test_in_memory_source() {
        let ts = NaiveDate::from_ymd_opt(2011, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let lines = vec![TransactionLine::new("1", 1i64, 1, 1.0, ts)];
        assert_eq!(lines.transactions().unwrap(), lines);
    }
}
