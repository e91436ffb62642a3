//! Multi-step portal actions combining calculations with the store.
//!
//! Writes are sequential awaits with no enclosing transaction. When a later
//! step fails, earlier writes stay in place and the error says how far the
//! action got.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::calculations::{
    BracketError, Compensation, compute_tax, suggest_for_profit, total_calculated_cost,
};
use crate::db::{BracketRepository, EnterpriseRepository, PayrollRepository, RepositoryError};
use crate::error::PortalError;
use crate::models::{
    AccountingPeriod, CalculationStatus, DotationEntry, DotationReport, NewAccountingPeriod,
    NewDotationEntry, NewDotationReport, NewSalaryCalculation, PerformanceCounters,
    SalaryCalculation,
};
use crate::validation::validate_period;

/// Figures entered for one accounting period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodInput {
    pub enterprise_id: i64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub gross_revenue: Decimal,
    pub deductible_expenses: Decimal,
    pub bank_balance: Decimal,
    pub employee_count: i32,
}

/// Taxes the period with its guild's brackets and stores it with the derived
/// tax fields.
pub async fn record_accounting_period<R>(
    repo: &R,
    input: PeriodInput,
) -> Result<AccountingPeriod, PortalError>
where
    R: BracketRepository + EnterpriseRepository + PayrollRepository + ?Sized,
{
    validate_period(input.period_start, input.period_end)?;

    let enterprise = repo.get_enterprise(input.enterprise_id).await?;
    let brackets = repo.get_tax_brackets(&enterprise.guild_id).await?;
    let tax = compute_tax(input.gross_revenue, input.deductible_expenses, &brackets)?;

    let period = repo
        .create_accounting_period(NewAccountingPeriod {
            enterprise_id: input.enterprise_id,
            period_start: input.period_start,
            period_end: input.period_end,
            gross_revenue: input.gross_revenue,
            deductible_expenses: input.deductible_expenses,
            bank_balance: input.bank_balance,
            employee_count: input.employee_count,
            tax_rate: tax.tax_rate,
            tax_amount: tax.tax_amount,
            profit_after_tax: tax.profit_after_tax,
        })
        .await?;

    info!(
        enterprise_id = period.enterprise_id,
        period_id = period.id,
        net_profit = %tax.net_profit,
        tax_amount = %tax.tax_amount,
        "recorded accounting period"
    );
    Ok(period)
}

/// Suggests a compensation from the enterprise's latest accounting period and
/// stores it as a pending salary calculation.
pub async fn suggest_and_save<R>(
    repo: &R,
    employee_id: i64,
    period_start: NaiveDate,
    period_end: NaiveDate,
    counters: PerformanceCounters,
) -> Result<(Compensation, SalaryCalculation), PortalError>
where
    R: BracketRepository + EnterpriseRepository + PayrollRepository + ?Sized,
{
    validate_period(period_start, period_end)?;

    let employee = repo.get_employee(employee_id).await?;
    if !employee.is_active {
        return Err(PortalError::validation(format!(
            "employee {} is not active",
            employee.name
        )));
    }
    let enterprise = repo.get_enterprise(employee.enterprise_id).await?;
    let latest = repo
        .list_accounting_periods(enterprise.id)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| {
            PortalError::validation(format!(
                "no accounting period recorded for {}",
                enterprise.name
            ))
        })?;
    let brackets = repo.get_tax_brackets(&enterprise.guild_id).await?;

    let compensation = suggest_for_profit(&employee, &counters, &brackets, latest.net_profit())?;

    let calculation = repo
        .create_salary_calculation(NewSalaryCalculation {
            employee_id: employee.id,
            enterprise_id: enterprise.id,
            period_start,
            period_end,
            counters,
            calculated_salary: compensation.salary,
            calculated_bonus: compensation.bonus,
        })
        .await?;

    info!(
        employee_id,
        salary = %compensation.salary,
        bonus = %compensation.bonus,
        tier = compensation.tier.as_str(),
        "saved salary suggestion"
    );
    Ok((compensation, calculation))
}

/// Pending cost for an enterprise's period.
pub async fn pending_payroll_cost<R>(
    repo: &R,
    enterprise_id: i64,
    period_start: NaiveDate,
) -> Result<Decimal, PortalError>
where
    R: PayrollRepository + ?Sized,
{
    let calculations = repo
        .list_salary_calculations(enterprise_id, period_start, Some(CalculationStatus::Pending))
        .await?;
    Ok(total_calculated_cost(&calculations)?)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DotationSubmitError {
    #[error("no pending salary calculations for enterprise {enterprise_id} from {period_start}")]
    NothingPending {
        enterprise_id: i64,
        period_start: NaiveDate,
    },

    /// Nothing was written.
    #[error("failed to create dotation report: {0}")]
    Report(#[source] RepositoryError),

    /// The report exists with only `written` of `expected` entries.
    #[error(
        "dotation report {report_id} partially written ({written} of {expected} entries): {source}"
    )]
    PartialWrite {
        report_id: i64,
        written: usize,
        expected: usize,
        #[source]
        source: RepositoryError,
    },

    /// Report and entries exist; some calculations are still `pending`.
    #[error("dotation report {report_id} written but calculation {calculation_id} not validated: {source}")]
    StatusNotUpdated {
        report_id: i64,
        calculation_id: i64,
        #[source]
        source: RepositoryError,
    },

    /// Nothing was written.
    #[error(transparent)]
    Total(#[from] BracketError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DotationSubmission {
    pub report: DotationReport,
    pub entries: Vec<DotationEntry>,
}

/// Turns an enterprise's pending calculations for a period into a dotation.
///
/// Steps, each a separate write: create the report, create one entry per
/// calculation, mark each calculation `validated`.
pub async fn submit_dotation<R>(
    repo: &R,
    enterprise_id: i64,
    period_start: NaiveDate,
    period_end: NaiveDate,
    created_by: Option<i64>,
) -> Result<DotationSubmission, DotationSubmitError>
where
    R: PayrollRepository + ?Sized,
{
    let pending = repo
        .list_salary_calculations(enterprise_id, period_start, Some(CalculationStatus::Pending))
        .await?;
    if pending.is_empty() {
        return Err(DotationSubmitError::NothingPending {
            enterprise_id,
            period_start,
        });
    }

    let total_amount = total_calculated_cost(&pending)?;
    let report = repo
        .create_dotation_report(NewDotationReport {
            enterprise_id,
            period_start,
            period_end,
            total_amount,
            created_by,
        })
        .await
        .map_err(DotationSubmitError::Report)?;

    let mut entries = Vec::with_capacity(pending.len());
    for calc in &pending {
        let entry = repo
            .create_dotation_entry(NewDotationEntry {
                report_id: report.id,
                employee_id: calc.employee_id,
                salary: calc.calculated_salary,
                bonus: calc.calculated_bonus,
            })
            .await
            .map_err(|source| {
                warn!(report_id = report.id, written = entries.len(), "dotation entry write failed");
                DotationSubmitError::PartialWrite {
                    report_id: report.id,
                    written: entries.len(),
                    expected: pending.len(),
                    source,
                }
            })?;
        entries.push(entry);
    }

    for calc in &pending {
        repo.set_salary_status(calc.id, CalculationStatus::Validated)
            .await
            .map_err(|source| DotationSubmitError::StatusNotUpdated {
                report_id: report.id,
                calculation_id: calc.id,
                source,
            })?;
    }

    info!(
        report_id = report.id,
        entries = entries.len(),
        total = %report.total_amount,
        "submitted dotation"
    );
    Ok(DotationSubmission { report, entries })
}
