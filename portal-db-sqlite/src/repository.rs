use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::debug;
use portal_core::auth::Fingerprint;
use portal_core::db::{AccountRepository, BracketRepository, EnterpriseRepository, PayrollRepository};
use portal_core::{
    Account, AccountSummary, AccountingPeriod, AppRole, CalculationStatus, DotationEntry,
    DotationReport, Employee, Enterprise, LoginAttempt, NewAccount, NewAccountingPeriod,
    NewDotationEntry, NewDotationReport, NewEmployee, NewEnterprise, NewLoginAttempt,
    NewSalaryCalculation, PerformanceCounters, RepositoryError, SalaryCalculation, TaxBracket,
};

use crate::decimal::{decimal_to_text, get_decimal};

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Opens `database_url` (a bare path, a `sqlite:` URL or `:memory:`),
    /// creating the file when missing.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database url: {}", database_url))?
            .create_if_missing(true);

        // Every connection to :memory: is a separate database.
        let pool_options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Load and execute all SQL seed files from the specified directory.
    /// Files are executed in alphabetical order by filename.
    pub async fn run_seeds(&self, seeds_dir: &Path) -> Result<()> {
        let mut entries: Vec<_> = std::fs::read_dir(seeds_dir)
            .with_context(|| format!("Failed to read seeds directory '{}'", seeds_dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sql"))
            .collect();

        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let sql = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read seed file '{}'", path.display()))?;

            sqlx::raw_sql(&sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to execute seed file '{}'", path.display()))?;
            debug!(seed = %path.display(), "applied seed file");
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn db_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

fn row_to_enterprise(row: &sqlx::sqlite::SqliteRow) -> Result<Enterprise, RepositoryError> {
    Ok(Enterprise {
        id: row.try_get("id").map_err(db_err)?,
        guild_id: row.try_get("guild_id").map_err(db_err)?,
        name: row.try_get("name").map_err(db_err)?,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(|e| RepositoryError::Database(format!("Failed to get created_at: {}", e)))?,
    })
}

fn row_to_employee(row: &sqlx::sqlite::SqliteRow) -> Result<Employee, RepositoryError> {
    Ok(Employee {
        id: row.try_get("id").map_err(db_err)?,
        enterprise_id: row.try_get("enterprise_id").map_err(db_err)?,
        account_id: row.try_get("account_id").map_err(db_err)?,
        name: row.try_get("name").map_err(db_err)?,
        grade: row.try_get("grade").map_err(db_err)?,
        salary: get_decimal(row, "salary")?,
        is_active: row.try_get("is_active").map_err(db_err)?,
    })
}

fn row_to_tax_bracket(row: &sqlx::sqlite::SqliteRow) -> Result<TaxBracket, RepositoryError> {
    Ok(TaxBracket {
        guild_id: row.try_get("guild_id").map_err(db_err)?,
        min_profit: get_decimal(row, "min_profit")?,
        max_profit: get_decimal(row, "max_profit")?,
        tax_rate: get_decimal(row, "tax_rate")?,
        max_employee_salary: get_decimal(row, "max_employee_salary")?,
        max_boss_salary: get_decimal(row, "max_boss_salary")?,
        max_employee_bonus: get_decimal(row, "max_employee_bonus")?,
        max_boss_bonus: get_decimal(row, "max_boss_bonus")?,
    })
}

fn row_to_accounting_period(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<AccountingPeriod, RepositoryError> {
    Ok(AccountingPeriod {
        id: row.try_get("id").map_err(db_err)?,
        enterprise_id: row.try_get("enterprise_id").map_err(db_err)?,
        period_start: row.try_get::<NaiveDate, _>("period_start").map_err(db_err)?,
        period_end: row.try_get::<NaiveDate, _>("period_end").map_err(db_err)?,
        gross_revenue: get_decimal(row, "gross_revenue")?,
        deductible_expenses: get_decimal(row, "deductible_expenses")?,
        bank_balance: get_decimal(row, "bank_balance")?,
        employee_count: row.try_get("employee_count").map_err(db_err)?,
        tax_rate: get_decimal(row, "tax_rate")?,
        tax_amount: get_decimal(row, "tax_amount")?,
        profit_after_tax: get_decimal(row, "profit_after_tax")?,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(|e| RepositoryError::Database(format!("Failed to get created_at: {}", e)))?,
    })
}

fn row_to_salary_calculation(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<SalaryCalculation, RepositoryError> {
    let status_str: String = row.try_get("status").map_err(db_err)?;
    let status = CalculationStatus::parse(&status_str).ok_or_else(|| {
        RepositoryError::Database(format!("Invalid calculation status: {}", status_str))
    })?;

    Ok(SalaryCalculation {
        id: row.try_get("id").map_err(db_err)?,
        employee_id: row.try_get("employee_id").map_err(db_err)?,
        enterprise_id: row.try_get("enterprise_id").map_err(db_err)?,
        period_start: row.try_get::<NaiveDate, _>("period_start").map_err(db_err)?,
        period_end: row.try_get::<NaiveDate, _>("period_end").map_err(db_err)?,
        counters: PerformanceCounters {
            run_count: row.try_get("run_count").map_err(db_err)?,
            invoice_count: row.try_get("invoice_count").map_err(db_err)?,
            sale_count: row.try_get("sale_count").map_err(db_err)?,
            total_revenue: get_decimal(row, "total_revenue")?,
        },
        calculated_salary: get_decimal(row, "calculated_salary")?,
        calculated_bonus: get_decimal(row, "calculated_bonus")?,
        status,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(|e| RepositoryError::Database(format!("Failed to get created_at: {}", e)))?,
    })
}

fn row_to_dotation_report(row: &sqlx::sqlite::SqliteRow) -> Result<DotationReport, RepositoryError> {
    Ok(DotationReport {
        id: row.try_get("id").map_err(db_err)?,
        enterprise_id: row.try_get("enterprise_id").map_err(db_err)?,
        period_start: row.try_get::<NaiveDate, _>("period_start").map_err(db_err)?,
        period_end: row.try_get::<NaiveDate, _>("period_end").map_err(db_err)?,
        total_amount: get_decimal(row, "total_amount")?,
        created_by: row.try_get("created_by").map_err(db_err)?,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(|e| RepositoryError::Database(format!("Failed to get created_at: {}", e)))?,
    })
}

fn row_to_dotation_entry(row: &sqlx::sqlite::SqliteRow) -> Result<DotationEntry, RepositoryError> {
    Ok(DotationEntry {
        id: row.try_get("id").map_err(db_err)?,
        report_id: row.try_get("report_id").map_err(db_err)?,
        employee_id: row.try_get("employee_id").map_err(db_err)?,
        salary: get_decimal(row, "salary")?,
        bonus: get_decimal(row, "bonus")?,
    })
}

fn parse_fingerprint(raw: String) -> Result<Fingerprint, RepositoryError> {
    raw.parse::<Fingerprint>()
        .map_err(|e| RepositoryError::Database(format!("Invalid stored fingerprint: {}", e)))
}

fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Result<Account, RepositoryError> {
    let hwid: Option<String> = row.try_get("hwid").map_err(db_err)?;

    Ok(Account {
        id: row.try_get("id").map_err(db_err)?,
        email: row.try_get("email").map_err(db_err)?,
        display_name: row.try_get("display_name").map_err(db_err)?,
        password_hash: row.try_get("password_hash").map_err(db_err)?,
        hwid: hwid.map(parse_fingerprint).transpose()?,
        hwid_reset_count: row.try_get("hwid_reset_count").map_err(db_err)?,
        last_hwid_reset: row
            .try_get::<Option<DateTime<Utc>>, _>("last_hwid_reset")
            .map_err(|e| {
                RepositoryError::Database(format!("Failed to get last_hwid_reset: {}", e))
            })?,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(|e| RepositoryError::Database(format!("Failed to get created_at: {}", e)))?,
    })
}

fn row_to_login_attempt(row: &sqlx::sqlite::SqliteRow) -> Result<LoginAttempt, RepositoryError> {
    Ok(LoginAttempt {
        id: row.try_get("id").map_err(db_err)?,
        account_id: row.try_get("account_id").map_err(db_err)?,
        fingerprint: parse_fingerprint(row.try_get("fingerprint").map_err(db_err)?)?,
        success: row.try_get("success").map_err(db_err)?,
        reason: row.try_get("reason").map_err(db_err)?,
        attempted_at: row
            .try_get::<DateTime<Utc>, _>("attempted_at")
            .map_err(|e| RepositoryError::Database(format!("Failed to get attempted_at: {}", e)))?,
    })
}

fn parse_role(raw: &str) -> Result<AppRole, RepositoryError> {
    AppRole::parse(raw).ok_or_else(|| RepositoryError::Database(format!("Invalid role: {}", raw)))
}

const ENTERPRISE_COLUMNS: &str = "id, guild_id, name, created_at";

const EMPLOYEE_COLUMNS: &str = "id, enterprise_id, account_id, name, grade, salary, is_active";

const PERIOD_COLUMNS: &str = "id, enterprise_id, period_start, period_end, gross_revenue,
    deductible_expenses, bank_balance, employee_count, tax_rate, tax_amount,
    profit_after_tax, created_at";

const CALCULATION_COLUMNS: &str = "id, employee_id, enterprise_id, period_start, period_end,
    run_count, invoice_count, sale_count, total_revenue, calculated_salary,
    calculated_bonus, status, created_at";

const ACCOUNT_COLUMNS: &str = "id, email, display_name, password_hash, hwid, hwid_reset_count,
    last_hwid_reset, created_at";

#[async_trait]
impl BracketRepository for SqliteRepository {
    async fn get_tax_brackets(&self, guild_id: &str) -> Result<Vec<TaxBracket>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT guild_id, min_profit, max_profit, tax_rate, max_employee_salary,
                    max_boss_salary, max_employee_bonus, max_boss_bonus
             FROM tax_brackets
             WHERE guild_id = ?
             ORDER BY CAST(min_profit AS REAL)",
        )
        .bind(guild_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_tax_bracket).collect()
    }

    async fn insert_tax_bracket(&self, bracket: &TaxBracket) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO tax_brackets (
                guild_id, min_profit, max_profit, tax_rate, max_employee_salary,
                max_boss_salary, max_employee_bonus, max_boss_bonus
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&bracket.guild_id)
        .bind(decimal_to_text(bracket.min_profit))
        .bind(decimal_to_text(bracket.max_profit))
        .bind(decimal_to_text(bracket.tax_rate))
        .bind(decimal_to_text(bracket.max_employee_salary))
        .bind(decimal_to_text(bracket.max_boss_salary))
        .bind(decimal_to_text(bracket.max_employee_bonus))
        .bind(decimal_to_text(bracket.max_boss_bonus))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn delete_tax_brackets(&self, guild_id: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM tax_brackets WHERE guild_id = ?")
            .bind(guild_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(())
    }
}

#[async_trait]
impl EnterpriseRepository for SqliteRepository {
    async fn create_enterprise(
        &self,
        enterprise: NewEnterprise,
    ) -> Result<Enterprise, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO enterprises (guild_id, name, created_at) VALUES (?, ?, ?)",
        )
        .bind(&enterprise.guild_id)
        .bind(&enterprise.name)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        self.get_enterprise(result.last_insert_rowid()).await
    }

    async fn get_enterprise(&self, id: i64) -> Result<Enterprise, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM enterprises WHERE id = ?",
            ENTERPRISE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_enterprise(&row)
    }

    async fn list_enterprises(&self) -> Result<Vec<Enterprise>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM enterprises ORDER BY name",
            ENTERPRISE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_enterprise).collect()
    }

    async fn create_employee(&self, employee: NewEmployee) -> Result<Employee, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO employees (enterprise_id, account_id, name, grade, salary, is_active)
             VALUES (?, ?, ?, ?, ?, 1)",
        )
        .bind(employee.enterprise_id)
        .bind(employee.account_id)
        .bind(&employee.name)
        .bind(&employee.grade)
        .bind(decimal_to_text(employee.salary))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        self.get_employee(result.last_insert_rowid()).await
    }

    async fn get_employee(&self, id: i64) -> Result<Employee, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM employees WHERE id = ?",
            EMPLOYEE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_employee(&row)
    }

    async fn list_employees(
        &self,
        enterprise_id: i64,
        active_only: bool,
    ) -> Result<Vec<Employee>, RepositoryError> {
        let filter = if active_only { " AND is_active = 1" } else { "" };
        let rows = sqlx::query(&format!(
            "SELECT {} FROM employees WHERE enterprise_id = ?{} ORDER BY name",
            EMPLOYEE_COLUMNS, filter
        ))
        .bind(enterprise_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_employee).collect()
    }
}

#[async_trait]
impl PayrollRepository for SqliteRepository {
    async fn create_accounting_period(
        &self,
        period: NewAccountingPeriod,
    ) -> Result<AccountingPeriod, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO accounting_periods (
                enterprise_id, period_start, period_end, gross_revenue, deductible_expenses,
                bank_balance, employee_count, tax_rate, tax_amount, profit_after_tax, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(period.enterprise_id)
        .bind(period.period_start)
        .bind(period.period_end)
        .bind(decimal_to_text(period.gross_revenue))
        .bind(decimal_to_text(period.deductible_expenses))
        .bind(decimal_to_text(period.bank_balance))
        .bind(period.employee_count)
        .bind(decimal_to_text(period.tax_rate))
        .bind(decimal_to_text(period.tax_amount))
        .bind(decimal_to_text(period.profit_after_tax))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        self.get_accounting_period(result.last_insert_rowid()).await
    }

    async fn get_accounting_period(&self, id: i64) -> Result<AccountingPeriod, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM accounting_periods WHERE id = ?",
            PERIOD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_accounting_period(&row)
    }

    async fn list_accounting_periods(
        &self,
        enterprise_id: i64,
    ) -> Result<Vec<AccountingPeriod>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM accounting_periods
             WHERE enterprise_id = ?
             ORDER BY period_start DESC, id DESC",
            PERIOD_COLUMNS
        ))
        .bind(enterprise_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_accounting_period).collect()
    }

    async fn create_salary_calculation(
        &self,
        calc: NewSalaryCalculation,
    ) -> Result<SalaryCalculation, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO salary_calculations (
                employee_id, enterprise_id, period_start, period_end, run_count,
                invoice_count, sale_count, total_revenue, calculated_salary,
                calculated_bonus, status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(calc.employee_id)
        .bind(calc.enterprise_id)
        .bind(calc.period_start)
        .bind(calc.period_end)
        .bind(calc.counters.run_count)
        .bind(calc.counters.invoice_count)
        .bind(calc.counters.sale_count)
        .bind(decimal_to_text(calc.counters.total_revenue))
        .bind(decimal_to_text(calc.calculated_salary))
        .bind(decimal_to_text(calc.calculated_bonus))
        .bind(CalculationStatus::Pending.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM salary_calculations WHERE id = ?",
            CALCULATION_COLUMNS
        ))
        .bind(result.last_insert_rowid())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        row_to_salary_calculation(&row)
    }

    async fn list_salary_calculations(
        &self,
        enterprise_id: i64,
        period_start: NaiveDate,
        status: Option<CalculationStatus>,
    ) -> Result<Vec<SalaryCalculation>, RepositoryError> {
        let base = format!(
            "SELECT {} FROM salary_calculations WHERE enterprise_id = ? AND period_start = ?",
            CALCULATION_COLUMNS
        );

        let rows = match status {
            Some(status) => {
                sqlx::query(&format!("{} AND status = ? ORDER BY id", base))
                    .bind(enterprise_id)
                    .bind(period_start)
                    .bind(status.as_str())
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                sqlx::query(&format!("{} ORDER BY id", base))
                    .bind(enterprise_id)
                    .bind(period_start)
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(db_err)?;

        rows.iter().map(row_to_salary_calculation).collect()
    }

    async fn set_salary_status(
        &self,
        id: i64,
        status: CalculationStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE salary_calculations SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn create_dotation_report(
        &self,
        report: NewDotationReport,
    ) -> Result<DotationReport, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO dotation_reports (
                enterprise_id, period_start, period_end, total_amount, created_by, created_at
            ) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(report.enterprise_id)
        .bind(report.period_start)
        .bind(report.period_end)
        .bind(decimal_to_text(report.total_amount))
        .bind(report.created_by)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let row = sqlx::query(
            "SELECT id, enterprise_id, period_start, period_end, total_amount, created_by, created_at
             FROM dotation_reports WHERE id = ?",
        )
        .bind(result.last_insert_rowid())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        row_to_dotation_report(&row)
    }

    async fn create_dotation_entry(
        &self,
        entry: NewDotationEntry,
    ) -> Result<DotationEntry, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO dotation_entries (report_id, employee_id, salary, bonus)
             VALUES (?, ?, ?, ?)",
        )
        .bind(entry.report_id)
        .bind(entry.employee_id)
        .bind(decimal_to_text(entry.salary))
        .bind(decimal_to_text(entry.bonus))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(DotationEntry {
            id: result.last_insert_rowid(),
            report_id: entry.report_id,
            employee_id: entry.employee_id,
            salary: entry.salary,
            bonus: entry.bonus,
        })
    }

    async fn list_dotation_entries(
        &self,
        report_id: i64,
    ) -> Result<Vec<DotationEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, report_id, employee_id, salary, bonus
             FROM dotation_entries WHERE report_id = ? ORDER BY id",
        )
        .bind(report_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_dotation_entry).collect()
    }
}

#[async_trait]
impl AccountRepository for SqliteRepository {
    async fn create_account(&self, account: NewAccount) -> Result<Account, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO accounts (email, display_name, password_hash, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&account.email)
        .bind(&account.display_name)
        .bind(&account.password_hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        self.get_account(result.last_insert_rowid()).await
    }

    async fn get_account(&self, id: i64) -> Result<Account, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM accounts WHERE id = ?",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_account(&row)
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Account, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM accounts WHERE email = ? COLLATE NOCASE",
            ACCOUNT_COLUMNS
        ))
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_account(&row)
    }

    async fn bind_fingerprint(
        &self,
        account_id: i64,
        fingerprint: &Fingerprint,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE accounts SET hwid = ? WHERE id = ? AND hwid IS NULL")
            .bind(fingerprint.as_str())
            .bind(account_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            // Either the account is gone or a fingerprint is already bound.
            self.get_account(account_id).await?;
            return Ok(false);
        }
        Ok(true)
    }

    async fn reset_fingerprint(&self, account_id: i64) -> Result<Account, RepositoryError> {
        let result = sqlx::query(
            "UPDATE accounts
             SET hwid = NULL, hwid_reset_count = hwid_reset_count + 1, last_hwid_reset = ?
             WHERE id = ?",
        )
        .bind(Utc::now())
        .bind(account_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get_account(account_id).await
    }

    async fn list_accounts_safe(&self) -> Result<Vec<AccountSummary>, RepositoryError> {
        let role_rows = sqlx::query("SELECT account_id, role FROM account_roles")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let mut highest: HashMap<i64, AppRole> = HashMap::new();
        for row in &role_rows {
            let account_id: i64 = row.try_get("account_id").map_err(db_err)?;
            let role_str: String = row.try_get("role").map_err(db_err)?;
            let role = parse_role(&role_str)?;
            highest
                .entry(account_id)
                .and_modify(|current| *current = (*current).max(role))
                .or_insert(role);
        }

        let rows = sqlx::query(&format!(
            "SELECT {} FROM accounts ORDER BY email",
            ACCOUNT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter()
            .map(|row| {
                let account = row_to_account(row)?;
                let mut summary = AccountSummary::from(&account);
                summary.highest_role = highest.get(&account.id).copied();
                Ok(summary)
            })
            .collect()
    }

    async fn assign_role(&self, account_id: i64, role: AppRole) -> Result<(), RepositoryError> {
        sqlx::query("INSERT OR IGNORE INTO account_roles (account_id, role) VALUES (?, ?)")
            .bind(account_id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(())
    }

    async fn highest_role(&self, account_id: i64) -> Result<Option<AppRole>, RepositoryError> {
        let rows = sqlx::query("SELECT role FROM account_roles WHERE account_id = ?")
            .bind(account_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let mut best = None;
        for row in &rows {
            let role_str: String = row.try_get("role").map_err(db_err)?;
            best = best.max(Some(parse_role(&role_str)?));
        }
        Ok(best)
    }

    async fn record_login_attempt(
        &self,
        attempt: NewLoginAttempt,
    ) -> Result<LoginAttempt, RepositoryError> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO login_attempts (account_id, fingerprint, success, reason, attempted_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(attempt.account_id)
        .bind(attempt.fingerprint.as_str())
        .bind(attempt.success)
        .bind(&attempt.reason)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(LoginAttempt {
            id: result.last_insert_rowid(),
            account_id: attempt.account_id,
            fingerprint: attempt.fingerprint,
            success: attempt.success,
            reason: attempt.reason,
            attempted_at: now,
        })
    }

    async fn list_login_attempts(
        &self,
        account_id: i64,
    ) -> Result<Vec<LoginAttempt>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, account_id, fingerprint, success, reason, attempted_at
             FROM login_attempts
             WHERE account_id = ?
             ORDER BY attempted_at DESC, id DESC",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_login_attempt).collect()
    }
}
