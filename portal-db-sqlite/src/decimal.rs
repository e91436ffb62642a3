//! Exact money columns.
//!
//! Amounts are written as normalized TEXT so no scale is lost. Reads also
//! accept INTEGER and REAL because seed files are hand-written.

use std::str::FromStr;

use portal_core::RepositoryError;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, TypeInfo, ValueRef};

fn read_err(column: &str, detail: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Database(format!("Cannot read '{column}': {detail}"))
}

/// Reads an amount column. NULL reads as zero.
pub fn get_decimal(row: &SqliteRow, column: &str) -> Result<Decimal, RepositoryError> {
    let raw = row
        .try_get_raw(column)
        .map_err(|e| RepositoryError::Database(format!("Column '{column}' not found: {e}")))?;
    if raw.is_null() {
        return Ok(Decimal::ZERO);
    }

    let storage = raw.type_info().name().to_string();
    match storage.as_str() {
        "TEXT" => {
            let text: String = row.try_get(column).map_err(|e| read_err(column, e))?;
            Decimal::from_str(text.trim()).map_err(|e| {
                RepositoryError::Database(format!(
                    "Failed to parse '{text}' in '{column}' as Decimal: {e}"
                ))
            })
        }
        "INTEGER" => row
            .try_get::<i64, _>(column)
            .map(Decimal::from)
            .map_err(|e| read_err(column, e)),
        "REAL" => {
            let real: f64 = row.try_get(column).map_err(|e| read_err(column, e))?;
            Decimal::try_from(real).map_err(|e| read_err(column, e))
        }
        other => Err(read_err(column, format!("unexpected storage class {other}"))),
    }
}

/// Like [`get_decimal`] but keeps NULL distinct from zero.
pub fn get_optional_decimal(row: &SqliteRow, column: &str) -> Result<Option<Decimal>, RepositoryError> {
    let raw = row
        .try_get_raw(column)
        .map_err(|e| RepositoryError::Database(format!("Column '{column}' not found: {e}")))?;
    if raw.is_null() {
        Ok(None)
    } else {
        get_decimal(row, column).map(Some)
    }
}

pub fn decimal_to_text(d: Decimal) -> String {
    d.normalize().to_string()
}
