//! End-to-end payroll workflows against an in-memory SQLite store.

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use sqlx::sqlite::SqlitePoolOptions;
use portal_core::db::{EnterpriseRepository, PayrollRepository};
use portal_core::workflows::{
    DotationSubmitError, PeriodInput, pending_payroll_cost, record_accounting_period,
    submit_dotation, suggest_and_save,
};
use portal_core::{
    CalculationStatus, Employee, Enterprise, NewEmployee, NewEnterprise, PerformanceCounters,
    PortalError,
};
use portal_db_sqlite::SqliteRepository;

const SEEDED_GUILD: &str = "112233445566778899";

async fn setup_test_db() -> SqliteRepository {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    let repo = SqliteRepository::new_with_pool(pool).await;
    repo.run_migrations()
        .await
        .expect("Failed to run migrations");
    repo.run_seeds(&std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("seeds"))
        .await
        .expect("Failed to run seeds");
    repo
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

async fn create_enterprise(repo: &SqliteRepository, guild_id: &str) -> Enterprise {
    repo.create_enterprise(NewEnterprise {
        guild_id: guild_id.to_string(),
        name: "Bennys".to_string(),
    })
    .await
    .expect("Failed to create enterprise")
}

async fn hire(repo: &SqliteRepository, enterprise_id: i64, grade: &str, salary: rust_decimal::Decimal) -> Employee {
    repo.create_employee(NewEmployee {
        enterprise_id,
        account_id: None,
        name: format!("{} Dupont", grade),
        grade: grade.to_string(),
        salary,
    })
    .await
    .expect("Failed to create employee")
}

fn march(enterprise_id: i64) -> PeriodInput {
    PeriodInput {
        enterprise_id,
        period_start: date(2025, 3, 1),
        period_end: date(2025, 3, 31),
        gross_revenue: dec!(150000),
        deductible_expenses: dec!(30000),
        bank_balance: dec!(80000),
        employee_count: 2,
    }
}

#[tokio::test]
async fn test_record_period_uses_guild_brackets() {
    let repo = setup_test_db().await;
    let enterprise = create_enterprise(&repo, SEEDED_GUILD).await;

    let period = record_accounting_period(&repo, march(enterprise.id))
        .await
        .expect("Failed to record period");

    assert_eq!(period.net_profit(), dec!(120000));
    assert_eq!(period.tax_rate, dec!(0.15));
    assert_eq!(period.tax_amount, dec!(18000));
    assert_eq!(period.profit_after_tax, dec!(102000));
    assert_eq!(
        repo.get_accounting_period(period.id).await,
        Ok(period)
    );
}

#[tokio::test]
async fn test_record_period_without_brackets_is_rejected() {
    let repo = setup_test_db().await;
    let enterprise = create_enterprise(&repo, "223344556677889900").await;

    let result = record_accounting_period(&repo, march(enterprise.id)).await;

    assert_eq!(result, Err(PortalError::NoBracketForProfit(dec!(120000))));
    assert!(repo.list_accounting_periods(enterprise.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_record_period_rejects_inverted_dates() {
    let repo = setup_test_db().await;
    let enterprise = create_enterprise(&repo, SEEDED_GUILD).await;
    let mut input = march(enterprise.id);
    input.period_end = date(2025, 2, 1);

    let result = record_accounting_period(&repo, input).await;

    assert!(matches!(result, Err(PortalError::Validation(_))));
}

#[tokio::test]
async fn test_suggest_requires_a_recorded_period() {
    let repo = setup_test_db().await;
    let enterprise = create_enterprise(&repo, SEEDED_GUILD).await;
    let employee = hire(&repo, enterprise.id, "Employé", dec!(2500)).await;

    let result = suggest_and_save(
        &repo,
        employee.id,
        date(2025, 3, 1),
        date(2025, 3, 31),
        PerformanceCounters::default(),
    )
    .await;

    assert!(matches!(result, Err(PortalError::Validation(msg)) if msg.contains("no accounting period")));
}

#[tokio::test]
async fn test_suggest_then_submit_dotation() {
    let repo = setup_test_db().await;
    let enterprise = create_enterprise(&repo, SEEDED_GUILD).await;
    let worker = hire(&repo, enterprise.id, "Employé", dec!(2500)).await;
    let boss = hire(&repo, enterprise.id, "Patron", dec!(6000)).await;
    record_accounting_period(&repo, march(enterprise.id))
        .await
        .expect("Failed to record period");

    // Net profit 120000 lands in the 100000..=249999 bracket.
    let (worker_comp, _) = suggest_and_save(
        &repo,
        worker.id,
        date(2025, 3, 1),
        date(2025, 3, 31),
        PerformanceCounters {
            run_count: 10,
            invoice_count: 2,
            sale_count: 1,
            total_revenue: dec!(12000),
        },
    )
    .await
    .expect("Failed to suggest for worker");
    let (boss_comp, _) = suggest_and_save(
        &repo,
        boss.id,
        date(2025, 3, 1),
        date(2025, 3, 31),
        PerformanceCounters {
            run_count: 30,
            invoice_count: 0,
            sale_count: 0,
            total_revenue: dec!(25000),
        },
    )
    .await
    .expect("Failed to suggest for boss");

    assert_eq!((worker_comp.salary, worker_comp.bonus), (dec!(4000), dec!(1000)));
    assert_eq!((boss_comp.salary, boss_comp.bonus), (dec!(8000), dec!(2000)));
    assert_eq!(
        pending_payroll_cost(&repo, enterprise.id, date(2025, 3, 1)).await,
        Ok(dec!(15000))
    );

    let submission = submit_dotation(&repo, enterprise.id, date(2025, 3, 1), date(2025, 3, 31), None)
        .await
        .expect("Failed to submit dotation");

    assert_eq!(submission.report.total_amount, dec!(15000));
    assert_eq!(
        repo.list_dotation_entries(submission.report.id).await.unwrap(),
        submission.entries
    );
    let statuses: Vec<_> = repo
        .list_salary_calculations(enterprise.id, date(2025, 3, 1), None)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.status)
        .collect();
    assert_eq!(statuses, vec![CalculationStatus::Validated; 2]);

    let again = submit_dotation(&repo, enterprise.id, date(2025, 3, 1), date(2025, 3, 31), None).await;
    assert_eq!(
        again,
        Err(DotationSubmitError::NothingPending {
            enterprise_id: enterprise.id,
            period_start: date(2025, 3, 1),
        })
    );
}
