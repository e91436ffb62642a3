//! Parsing and checking of raw user input.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;

use crate::error::PortalError;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

/// Discord snowflakes are 17 to 20 decimal digits.
static SNOWFLAKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{17,20}$").expect("snowflake pattern is valid"));

/// Largest amount accepted from user input (one quadrillion).
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

/// Trims whitespace and drops thousands separators.
fn normalize_amount(s: &str) -> String {
    s.trim().replace([',', ' ', '_'], "")
}

/// Parses a required monetary amount such as `"12,500.50"`.
pub fn parse_amount(field: &str, input: &str) -> Result<Decimal, PortalError> {
    let normalized = normalize_amount(input);
    if normalized.is_empty() {
        return Err(PortalError::validation(format!("{field} is required")));
    }
    normalized.parse().map_err(|e| {
        tracing::debug!(field, input, "invalid amount: {}", e);
        PortalError::validation(format!("{field} must be a number, got '{input}'"))
    })
}

/// Like [`parse_amount`], rejecting negative values and anything above
/// [`MAX_AMOUNT`].
pub fn parse_non_negative_amount(field: &str, input: &str) -> Result<Decimal, PortalError> {
    let amount = parse_amount(field, input)?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(PortalError::validation(format!("{field} must not be negative")));
    }
    if amount > MAX_AMOUNT {
        return Err(PortalError::validation(format!("{field} must not exceed {MAX_AMOUNT}")));
    }
    Ok(amount)
}

/// Parses an ISO `YYYY-MM-DD` date.
pub fn parse_date(field: &str, input: &str) -> Result<NaiveDate, PortalError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
        PortalError::validation(format!("{field} must be a YYYY-MM-DD date, got '{input}'"))
    })
}

pub fn validate_period(start: NaiveDate, end: NaiveDate) -> Result<(), PortalError> {
    if start > end {
        return Err(PortalError::validation(format!(
            "period start {start} is after period end {end}"
        )));
    }
    Ok(())
}

/// Returns the address lowercased.
pub fn validate_email(email: &str) -> Result<String, PortalError> {
    let email = email.trim();
    if !EMAIL.is_match(email) {
        return Err(PortalError::validation(format!("'{email}' is not a valid email address")));
    }
    Ok(email.to_lowercase())
}

pub fn validate_guild_id(guild_id: &str) -> Result<(), PortalError> {
    if !SNOWFLAKE.is_match(guild_id) {
        return Err(PortalError::validation(format!(
            "'{guild_id}' is not a Discord guild id"
        )));
    }
    Ok(())
}
