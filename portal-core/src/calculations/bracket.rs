//! Guild tax-bracket resolution and bracket-based profit taxation.
//!
//! A guild configures an ordered table of [`TaxBracket`]s, each covering an
//! inclusive `[min_profit, max_profit]` range of net profit. Resolution scans
//! the table in order and returns the **first** covering bracket; tables
//! written through [`validate_brackets`] never overlap, so first-match only
//! matters for tables that bypassed validation.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use portal_core::calculations::compute_tax;
//! use portal_core::TaxBracket;
//!
//! let bracket = |min, max, rate| TaxBracket {
//!     guild_id: "1".to_string(),
//!     min_profit: min,
//!     max_profit: max,
//!     tax_rate: rate,
//!     max_employee_salary: dec!(2500),
//!     max_boss_salary: dec!(5000),
//!     max_employee_bonus: dec!(1000),
//!     max_boss_bonus: dec!(2000),
//! };
//! let brackets = vec![
//!     bracket(dec!(0), dec!(10000), dec!(0.10)),
//!     bracket(dec!(10001), dec!(50000), dec!(0.20)),
//! ];
//!
//! let result = compute_tax(dec!(8000), dec!(2000), &brackets).unwrap();
//!
//! assert_eq!(result.net_profit, dec!(6000));
//! assert_eq!(result.tax_amount, dec!(600));
//! assert_eq!(result.profit_after_tax, dec!(5400));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::TaxBracket;

/// Errors raised by bracket resolution and bracket-table validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BracketError {
    /// No configured bracket covers the net profit. Terminal for any
    /// calculation that needs a tax rate or a ceiling.
    #[error("no tax bracket covers net profit {0}")]
    NoBracketForProfit(Decimal),

    #[error("bracket {min}..={max} for guild {guild_id} has min_profit above max_profit")]
    InvertedRange {
        guild_id: String,
        min: Decimal,
        max: Decimal,
    },

    #[error("tax rate {rate} for guild {guild_id} is outside 0..=1")]
    RateOutOfRange { guild_id: String, rate: Decimal },

    #[error("brackets {first} and {second} for guild {guild_id} overlap")]
    Overlap {
        guild_id: String,
        first: String,
        second: String,
    },

    #[error("bracket starting at {min} for guild {guild_id} has a negative {ceiling} ceiling")]
    NegativeCeiling {
        guild_id: String,
        min: Decimal,
        ceiling: &'static str,
    },

    /// An intermediate amount does not fit in a `Decimal`.
    #[error("{0} is too large to compute")]
    AmountOverflow(&'static str),
}

/// Outcome of taxing one accounting period's net profit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxResult {
    pub net_profit: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub profit_after_tax: Decimal,
    pub bracket: TaxBracket,
}

/// Returns the first bracket, in slice order, whose inclusive range contains
/// `profit`.
pub fn resolve_bracket(brackets: &[TaxBracket], profit: Decimal) -> Option<&TaxBracket> {
    let found = brackets.iter().find(|b| b.covers(profit));
    debug!(%profit, candidates = brackets.len(), found = found.is_some(), "resolved tax bracket");
    found
}

/// Taxes `gross_revenue - deductible_expenses` at the covering bracket's rate.
///
/// Net profit is not floored at zero; a negative profit only resolves if a
/// bracket explicitly covers it.
///
/// # Errors
///
/// [`BracketError::NoBracketForProfit`] when the table is empty or no bracket
/// covers the net profit.
pub fn compute_tax(
    gross_revenue: Decimal,
    deductible_expenses: Decimal,
    brackets: &[TaxBracket],
) -> Result<TaxResult, BracketError> {
    let net_profit = gross_revenue
        .checked_sub(deductible_expenses)
        .ok_or(BracketError::AmountOverflow("net profit"))?;
    let bracket =
        resolve_bracket(brackets, net_profit).ok_or(BracketError::NoBracketForProfit(net_profit))?;

    let tax_amount = net_profit
        .checked_mul(bracket.tax_rate)
        .ok_or(BracketError::AmountOverflow("tax amount"))?;
    let profit_after_tax = net_profit
        .checked_sub(tax_amount)
        .ok_or(BracketError::AmountOverflow("profit after tax"))?;

    Ok(TaxResult {
        net_profit,
        tax_rate: bracket.tax_rate,
        tax_amount,
        profit_after_tax,
        bracket: bracket.clone(),
    })
}

/// Checks a bracket table before it is written.
///
/// Brackets are grouped by guild; within a guild every range must be
/// well-formed, carry a rate in `0..=1` and non-negative ceilings, and share
/// no profit value with any other range. Gaps between ranges are allowed.
pub fn validate_brackets(brackets: &[TaxBracket]) -> Result<(), BracketError> {
    for b in brackets {
        if b.min_profit > b.max_profit {
            return Err(BracketError::InvertedRange {
                guild_id: b.guild_id.clone(),
                min: b.min_profit,
                max: b.max_profit,
            });
        }
        if b.tax_rate < Decimal::ZERO || b.tax_rate > Decimal::ONE {
            return Err(BracketError::RateOutOfRange {
                guild_id: b.guild_id.clone(),
                rate: b.tax_rate,
            });
        }
        let ceilings = [
            ("employee salary", b.max_employee_salary),
            ("boss salary", b.max_boss_salary),
            ("employee bonus", b.max_employee_bonus),
            ("boss bonus", b.max_boss_bonus),
        ];
        let negative = ceilings
            .into_iter()
            .find(|(_, v)| v.is_sign_negative() && !v.is_zero());
        if let Some((ceiling, _)) = negative {
            return Err(BracketError::NegativeCeiling {
                guild_id: b.guild_id.clone(),
                min: b.min_profit,
                ceiling,
            });
        }
    }

    let mut sorted: Vec<&TaxBracket> = brackets.iter().collect();
    sorted.sort_by(|a, b| {
        a.guild_id
            .cmp(&b.guild_id)
            .then_with(|| a.min_profit.cmp(&b.min_profit))
    });

    for pair in sorted.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        if prev.guild_id == next.guild_id && next.min_profit <= prev.max_profit {
            return Err(BracketError::Overlap {
                guild_id: prev.guild_id.clone(),
                first: format!("{}..={}", prev.min_profit, prev.max_profit),
                second: format!("{}..={}", next.min_profit, next.max_profit),
            });
        }
    }

    Ok(())
}
