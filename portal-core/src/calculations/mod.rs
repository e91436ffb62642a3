//! Payroll and tax calculations.
//!
//! Everything here is pure: inputs are snapshots passed by the caller and
//! nothing is persisted.

pub mod bracket;
pub mod common;
pub mod compensation;
pub mod flat_tax;

pub use bracket::{BracketError, TaxResult, compute_tax, resolve_bracket, validate_brackets};
pub use compensation::{
    Compensation, base_performance, suggest_compensation, suggest_for_profit,
    total_calculated_cost,
};
pub use flat_tax::{FlatTaxBreakdown, compute_flat_tax};
