//! Flat-rate taxation for generic payroll reports.
//!
//! Unrelated to guild brackets: four fixed rates are applied independently to
//! gross income and summed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const FEDERAL_RATE: Decimal = Decimal::from_parts(22, 0, 0, false, 2);
pub const STATE_RATE: Decimal = Decimal::from_parts(8, 0, 0, false, 2);
pub const SOCIAL_SECURITY_RATE: Decimal = Decimal::from_parts(62, 0, 0, false, 3);
pub const MEDICARE_RATE: Decimal = Decimal::from_parts(145, 0, 0, false, 4);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatTaxBreakdown {
    pub gross_income: Decimal,
    pub federal: Decimal,
    pub state: Decimal,
    pub social_security: Decimal,
    pub medicare: Decimal,
    pub total_tax: Decimal,
    pub net_income: Decimal,
}

/// Every component is at most 22% of `gross_income`, so no step can
/// overflow a `Decimal`.
pub fn compute_flat_tax(gross_income: Decimal) -> FlatTaxBreakdown {
    let federal = gross_income * FEDERAL_RATE;
    let state = gross_income * STATE_RATE;
    let social_security = gross_income * SOCIAL_SECURITY_RATE;
    let medicare = gross_income * MEDICARE_RATE;
    let total_tax = federal + state + social_security + medicare;

    FlatTaxBreakdown {
        gross_income,
        federal,
        state,
        social_security,
        medicare,
        total_tax,
        net_income: gross_income - total_tax,
    }
}
