use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::auth::Fingerprint;
use crate::models::{
    Account, AccountSummary, AccountingPeriod, AppRole, CalculationStatus, DotationEntry,
    DotationReport, Employee, Enterprise, LoginAttempt, NewAccount, NewAccountingPeriod,
    NewDotationEntry, NewDotationReport, NewEmployee, NewEnterprise, NewLoginAttempt,
    NewSalaryCalculation, SalaryCalculation, TaxBracket,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

#[async_trait]
pub trait BracketRepository: Send + Sync {
    /// Brackets for one guild, ordered by `min_profit`.
    async fn get_tax_brackets(&self, guild_id: &str) -> Result<Vec<TaxBracket>, RepositoryError>;

    async fn insert_tax_bracket(&self, bracket: &TaxBracket) -> Result<(), RepositoryError>;

    async fn delete_tax_brackets(&self, guild_id: &str) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait EnterpriseRepository: Send + Sync {
    async fn create_enterprise(
        &self,
        enterprise: NewEnterprise,
    ) -> Result<Enterprise, RepositoryError>;

    async fn get_enterprise(&self, id: i64) -> Result<Enterprise, RepositoryError>;

    async fn list_enterprises(&self) -> Result<Vec<Enterprise>, RepositoryError>;

    // Employees
    async fn create_employee(&self, employee: NewEmployee) -> Result<Employee, RepositoryError>;

    async fn get_employee(&self, id: i64) -> Result<Employee, RepositoryError>;

    async fn list_employees(
        &self,
        enterprise_id: i64,
        active_only: bool,
    ) -> Result<Vec<Employee>, RepositoryError>;
}

#[async_trait]
pub trait PayrollRepository: Send + Sync {
    // Accounting periods
    async fn create_accounting_period(
        &self,
        period: NewAccountingPeriod,
    ) -> Result<AccountingPeriod, RepositoryError>;

    async fn get_accounting_period(&self, id: i64) -> Result<AccountingPeriod, RepositoryError>;

    /// Most recent period first.
    async fn list_accounting_periods(
        &self,
        enterprise_id: i64,
    ) -> Result<Vec<AccountingPeriod>, RepositoryError>;

    // Salary calculations
    async fn create_salary_calculation(
        &self,
        calc: NewSalaryCalculation,
    ) -> Result<SalaryCalculation, RepositoryError>;

    async fn list_salary_calculations(
        &self,
        enterprise_id: i64,
        period_start: NaiveDate,
        status: Option<CalculationStatus>,
    ) -> Result<Vec<SalaryCalculation>, RepositoryError>;

    async fn set_salary_status(
        &self,
        id: i64,
        status: CalculationStatus,
    ) -> Result<(), RepositoryError>;

    // Dotations
    async fn create_dotation_report(
        &self,
        report: NewDotationReport,
    ) -> Result<DotationReport, RepositoryError>;

    async fn create_dotation_entry(
        &self,
        entry: NewDotationEntry,
    ) -> Result<DotationEntry, RepositoryError>;

    async fn list_dotation_entries(
        &self,
        report_id: i64,
    ) -> Result<Vec<DotationEntry>, RepositoryError>;
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn create_account(&self, account: NewAccount) -> Result<Account, RepositoryError>;

    async fn get_account(&self, id: i64) -> Result<Account, RepositoryError>;

    /// Lookup is case-insensitive on the email address.
    async fn find_account_by_email(&self, email: &str) -> Result<Account, RepositoryError>;

    /// Stores `fingerprint` only when the account has none yet. Returns
    /// `false` when another fingerprint was already in place.
    async fn bind_fingerprint(
        &self,
        account_id: i64,
        fingerprint: &Fingerprint,
    ) -> Result<bool, RepositoryError>;

    /// Clears the stored fingerprint, bumps the reset counter and stamps the
    /// reset time. Returns the updated account.
    async fn reset_fingerprint(&self, account_id: i64) -> Result<Account, RepositoryError>;

    /// Redacted listing with each account's highest role.
    async fn list_accounts_safe(&self) -> Result<Vec<AccountSummary>, RepositoryError>;

    // Roles
    async fn assign_role(&self, account_id: i64, role: AppRole) -> Result<(), RepositoryError>;

    /// `None` when the account holds no role.
    async fn highest_role(&self, account_id: i64) -> Result<Option<AppRole>, RepositoryError>;

    // Login audit
    async fn record_login_attempt(
        &self,
        attempt: NewLoginAttempt,
    ) -> Result<LoginAttempt, RepositoryError>;

    /// Most recent attempt first.
    async fn list_login_attempts(
        &self,
        account_id: i64,
    ) -> Result<Vec<LoginAttempt>, RepositoryError>;
}

/// Everything a storage backend provides.
pub trait PortalRepository:
    BracketRepository + EnterpriseRepository + PayrollRepository + AccountRepository
{
}

impl<T> PortalRepository for T where
    T: BracketRepository + EnterpriseRepository + PayrollRepository + AccountRepository
{
}
