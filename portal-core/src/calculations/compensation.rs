//! Salary and bonus suggestions for a dotation.
//!
//! | Step | Value |
//! |------|-------|
//! | 1    | Tier from the employee's grade |
//! | 2    | Salary and bonus ceilings for that tier from the bracket |
//! | 3    | Base performance: runs × 100 + invoices × 150 + sales × 200 |
//! | 4    | Revenue bonus: total revenue × 10% |
//! | 5    | Salary: min(base performance + current salary, salary ceiling), rounded |
//! | 6    | Bonus: min(revenue bonus, bonus ceiling), rounded |

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::bracket::{BracketError, resolve_bracket};
use crate::calculations::common::round_whole;
use crate::{
    CalculationStatus, Ceilings, Employee, PerformanceCounters, SalaryCalculation, TaxBracket,
    Tier,
};

pub const RUN_WEIGHT: Decimal = Decimal::from_parts(100, 0, 0, false, 0);
pub const INVOICE_WEIGHT: Decimal = Decimal::from_parts(150, 0, 0, false, 0);
pub const SALE_WEIGHT: Decimal = Decimal::from_parts(200, 0, 0, false, 0);
/// Share of total revenue paid out as bonus (10%).
pub const REVENUE_SHARE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// A suggested compensation, with the intermediate values shown to the
/// person validating the dotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compensation {
    pub tier: Tier,
    pub ceilings: Ceilings,
    pub base_performance: Decimal,
    pub revenue_bonus: Decimal,
    pub salary: Decimal,
    pub bonus: Decimal,
}

/// Weighted sum of the performance counters. Cannot overflow: even at
/// `u32::MAX` per counter the sum stays below 2^42.
pub fn base_performance(counters: &PerformanceCounters) -> Decimal {
    Decimal::from(counters.run_count) * RUN_WEIGHT
        + Decimal::from(counters.invoice_count) * INVOICE_WEIGHT
        + Decimal::from(counters.sale_count) * SALE_WEIGHT
}

/// Suggests a salary and bonus capped at the bracket's ceilings for the
/// employee's tier.
///
/// # Errors
///
/// [`BracketError::AmountOverflow`] when the uncapped salary or bonus does not
/// fit in a `Decimal`.
pub fn suggest_compensation(
    employee: &Employee,
    counters: &PerformanceCounters,
    bracket: &TaxBracket,
) -> Result<Compensation, BracketError> {
    let tier = employee.tier();
    let ceilings = bracket.ceilings(tier);

    let base_performance = base_performance(counters);
    let revenue_bonus = counters
        .total_revenue
        .checked_mul(REVENUE_SHARE)
        .ok_or(BracketError::AmountOverflow("revenue bonus"))?;
    let uncapped_salary = base_performance
        .checked_add(employee.salary)
        .ok_or(BracketError::AmountOverflow("salary"))?;

    let salary = round_whole(uncapped_salary.min(ceilings.salary));
    let bonus = round_whole(revenue_bonus.min(ceilings.bonus));

    Ok(Compensation {
        tier,
        ceilings,
        base_performance,
        revenue_bonus,
        salary,
        bonus,
    })
}

/// Resolves the bracket for `net_profit`, then suggests a compensation.
///
/// # Errors
///
/// [`BracketError::NoBracketForProfit`] when no bracket covers the profit.
/// Ceilings are never defaulted to zero.
pub fn suggest_for_profit(
    employee: &Employee,
    counters: &PerformanceCounters,
    brackets: &[TaxBracket],
    net_profit: Decimal,
) -> Result<Compensation, BracketError> {
    let bracket =
        resolve_bracket(brackets, net_profit).ok_or(BracketError::NoBracketForProfit(net_profit))?;
    suggest_compensation(employee, counters, bracket)
}

/// Sum of salary and bonus over every calculation still pending.
///
/// # Errors
///
/// [`BracketError::AmountOverflow`] when the total does not fit in a `Decimal`.
pub fn total_calculated_cost(calculations: &[SalaryCalculation]) -> Result<Decimal, BracketError> {
    calculations
        .iter()
        .filter(|c| c.status == CalculationStatus::Pending)
        .try_fold(Decimal::ZERO, |total, c| {
            total
                .checked_add(c.calculated_salary)
                .and_then(|t| t.checked_add(c.calculated_bonus))
        })
        .ok_or(BracketError::AmountOverflow("payroll total"))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn test_bracket() -> TaxBracket {
        TaxBracket {
            guild_id: "100".to_string(),
            min_profit: dec!(0),
            max_profit: dec!(10000),
            tax_rate: dec!(0.10),
            max_employee_salary: dec!(2500),
            max_boss_salary: dec!(5000),
            max_employee_bonus: dec!(1000),
            max_boss_bonus: dec!(2000),
        }
    }

    fn employee(grade: &str, salary: Decimal) -> Employee {
        Employee {
            id: 1,
            enterprise_id: 1,
            account_id: None,
            name: "Jean".to_string(),
            grade: grade.to_string(),
            salary,
            is_active: true,
        }
    }

    fn counters(runs: u32, invoices: u32, sales: u32, revenue: Decimal) -> PerformanceCounters {
        PerformanceCounters {
            run_count: runs,
            invoice_count: invoices,
            sale_count: sales,
            total_revenue: revenue,
        }
    }

    fn calculation(salary: Decimal, bonus: Decimal, status: CalculationStatus) -> SalaryCalculation {
        let day = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        SalaryCalculation {
            id: 1,
            employee_id: 1,
            enterprise_id: 1,
            period_start: day,
            period_end: day,
            counters: PerformanceCounters::default(),
            calculated_salary: salary,
            calculated_bonus: bonus,
            status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn base_performance_uses_fixed_weights() {
        assert_eq!(base_performance(&counters(2, 3, 4, dec!(0))), dec!(1450));
    }

    #[test]
    fn patron_salary_is_capped_at_boss_ceiling() {
        // 10 runs × 100 + 6000 current salary = 7000
        let result = suggest_compensation(
            &employee("Patron", dec!(6000)),
            &counters(10, 0, 0, dec!(0)),
            &test_bracket(),
        )
        .unwrap();

        assert_eq!(result.tier, Tier::Manager);
        assert_eq!(result.base_performance + dec!(6000), dec!(7000));
        assert_eq!(result.salary, dec!(5000));
    }

    #[test]
    fn employee_uses_employee_ceilings() {
        let result = suggest_compensation(
            &employee("employe", dec!(1000)),
            &counters(5, 5, 5, dec!(50000)),
            &test_bracket(),
        )
        .unwrap();

        assert_eq!(result.tier, Tier::Employee);
        assert_eq!(result.ceilings.salary, dec!(2500));
        assert_eq!(result.salary, dec!(2500));
        assert_eq!(result.revenue_bonus, dec!(5000));
        assert_eq!(result.bonus, dec!(1000));
    }

    #[test]
    fn below_ceiling_values_pass_through_rounded() {
        let result = suggest_compensation(
            &employee("employe", dec!(800.40)),
            &counters(1, 1, 0, dec!(1234.5)),
            &test_bracket(),
        )
        .unwrap();

        // 100 + 150 + 800.40 = 1050.40
        assert_eq!(result.salary, dec!(1050));
        // 123.45 rounds to 123
        assert_eq!(result.bonus, dec!(123));
    }

    #[test]
    fn co_patron_uses_manager_bonus_ceiling() {
        let result = suggest_compensation(
            &employee("CO-PATRON", dec!(0)),
            &counters(0, 0, 0, dec!(100000)),
            &test_bracket(),
        )
        .unwrap();

        assert_eq!(result.bonus, dec!(2000));
    }

    #[test]
    fn suggestions_never_exceed_ceilings() {
        let bracket = test_bracket();
        for grade in ["patron", "employe"] {
            for n in [0u32, 1, 7, 40, 1000] {
                let emp = employee(grade, Decimal::from(n) * dec!(37));
                let c = counters(n, n * 2, n * 3, Decimal::from(n) * dec!(999.99));
                let result = suggest_compensation(&emp, &c, &bracket).unwrap();
                let ceilings = bracket.ceilings(emp.tier());

                assert!(result.salary <= ceilings.salary, "{grade} n={n}");
                assert!(result.bonus <= ceilings.bonus, "{grade} n={n}");
            }
        }
    }

    #[test]
    fn suggest_for_profit_fails_without_bracket() {
        let result = suggest_for_profit(
            &employee("patron", dec!(0)),
            &counters(1, 1, 1, dec!(10)),
            &[test_bracket()],
            dec!(-500),
        );

        assert_eq!(result, Err(BracketError::NoBracketForProfit(dec!(-500))));
    }

    #[test]
    fn suggest_for_profit_resolves_bracket() {
        let result = suggest_for_profit(
            &employee("patron", dec!(0)),
            &counters(1, 0, 0, dec!(0)),
            &[test_bracket()],
            dec!(4000),
        )
        .unwrap();

        assert_eq!(result.salary, dec!(100));
    }

    #[test]
    fn total_cost_counts_pending_only() {
        let calcs = vec![
            calculation(dec!(1000), dec!(200), CalculationStatus::Pending),
            calculation(dec!(500), dec!(50), CalculationStatus::Pending),
            calculation(dec!(9999), dec!(9999), CalculationStatus::Validated),
        ];

        assert_eq!(total_calculated_cost(&calcs), Ok(dec!(1750)));
    }

    #[test]
    fn total_cost_of_nothing_is_zero() {
        assert_eq!(total_calculated_cost(&[]), Ok(Decimal::ZERO));
    }

    #[test]
    fn base_performance_fits_at_counter_limits() {
        let result = base_performance(&counters(u32::MAX, u32::MAX, u32::MAX, dec!(0)));

        assert_eq!(result, Decimal::from(u32::MAX) * dec!(450));
    }

    #[test]
    fn huge_salary_is_an_error_not_a_panic() {
        let result = suggest_compensation(
            &employee("patron", Decimal::MAX),
            &counters(1, 0, 0, dec!(0)),
            &test_bracket(),
        );

        assert_eq!(result, Err(BracketError::AmountOverflow("salary")));
    }

    #[test]
    fn huge_revenue_is_capped_at_bonus_ceiling() {
        let result = suggest_compensation(
            &employee("patron", dec!(0)),
            &counters(0, 0, 0, Decimal::MAX),
            &test_bracket(),
        )
        .unwrap();

        assert_eq!(result.bonus, dec!(2000));
    }

    #[test]
    fn total_cost_overflow_is_an_error() {
        let calcs = vec![
            calculation(Decimal::MAX, dec!(0), CalculationStatus::Pending),
            calculation(dec!(1), dec!(0), CalculationStatus::Pending),
        ];

        assert_eq!(
            total_calculated_cost(&calcs),
            Err(BracketError::AmountOverflow("payroll total"))
        );
    }
}
