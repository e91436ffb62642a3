//! Shared helpers for the payroll and tax calculations.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a decimal value to the nearest whole unit, midpoints away from zero.
///
/// Suggested salaries and bonuses are whole amounts of in-game currency.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use portal_core::calculations::common::round_whole;
///
/// assert_eq!(round_whole(dec!(1234.4)), dec!(1234));
/// assert_eq!(round_whole(dec!(1234.5)), dec!(1235));
/// assert_eq!(round_whole(dec!(-1234.5)), dec!(-1235)); // Away from zero
/// ```
pub fn round_whole(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn round_whole_rounds_down_below_midpoint() {
        assert_eq!(round_whole(dec!(99.49)), dec!(99));
    }

    #[test]
    fn round_whole_rounds_up_at_midpoint() {
        assert_eq!(round_whole(dec!(99.5)), dec!(100));
    }

    #[test]
    fn round_whole_handles_negative_midpoint() {
        assert_eq!(round_whole(dec!(-0.5)), dec!(-1));
    }

    #[test]
    fn round_whole_preserves_integers() {
        assert_eq!(round_whole(dec!(5000)), dec!(5000));
        assert_eq!(round_whole(Decimal::ZERO), Decimal::ZERO);
    }
}
