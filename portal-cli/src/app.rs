use std::fmt::Write;

use anyhow::{Context, Result};
use portal_core::PortalError;
use portal_core::auth::{DeviceBindingAuth, FingerprintSignals, hash_password};
use portal_core::calculations::{compute_flat_tax, compute_tax};
use portal_core::db::{PortalRepository, RepositoryRegistry};
use portal_core::validation::{validate_email, validate_guild_id};
use portal_core::workflows::{
    PeriodInput, pending_payroll_cost, record_accounting_period, submit_dotation,
    suggest_and_save,
};
use portal_core::{NewAccount, NewEmployee, NewEnterprise, PerformanceCounters};
use portal_db_sqlite::SqliteRepositoryFactory;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::cli::{
    AccountCommand, Command, DotationCommand, EmployeeCommand, EnterpriseCommand, PeriodCommand,
};
use crate::config::PortalConfig;

/// Registry with every backend compiled into this binary.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry
}

pub async fn open_repository(config: &PortalConfig) -> Result<Box<dyn PortalRepository>> {
    let db_config = config.db_config();
    debug!("connecting to {} backend", db_config.backend);
    let repo = build_registry()
        .create(&db_config)
        .await
        .with_context(|| format!("cannot open database '{}'", db_config.connection_string))?;
    Ok(repo)
}

/// Runs one command and returns the text to print. Opens the store only for
/// commands that need it.
pub async fn run(command: &Command, config: &PortalConfig) -> Result<String> {
    match command {
        Command::FlatTax { gross } => flat_tax_report(*gross),
        Command::Fingerprint(signals) => Ok(FingerprintSignals::from(signals).derive().to_string()),
        _ => {
            let repo = open_repository(config).await?;
            execute(command, &*repo, config).await
        }
    }
}

/// Runs one command against an already opened store.
pub async fn execute(
    command: &Command,
    repo: &dyn PortalRepository,
    config: &PortalConfig,
) -> Result<String> {
    match command {
        Command::Tax {
            guild,
            gross,
            expenses,
        } => tax_report(repo, guild, *gross, *expenses).await,
        Command::FlatTax { gross } => flat_tax_report(*gross),
        Command::Period(PeriodCommand::Record {
            enterprise,
            start,
            end,
            gross,
            expenses,
            bank,
            employees,
        }) => {
            let period = record_accounting_period(
                repo,
                PeriodInput {
                    enterprise_id: *enterprise,
                    period_start: *start,
                    period_end: *end,
                    gross_revenue: *gross,
                    deductible_expenses: *expenses,
                    bank_balance: *bank,
                    employee_count: *employees,
                },
            )
            .await?;

            let mut out = String::new();
            writeln!(out, "Recorded period #{} ({} to {})", period.id, start, end)?;
            writeln!(out, "  Net profit:        {}", money(period.net_profit()))?;
            writeln!(out, "  Tax rate:          {}", percent(period.tax_rate))?;
            writeln!(out, "  Tax amount:        {}", money(period.tax_amount))?;
            write!(out, "  Profit after tax:  {}", money(period.profit_after_tax))?;
            Ok(out)
        }
        Command::Period(PeriodCommand::List { enterprise }) => {
            let periods = repo
                .list_accounting_periods(*enterprise)
                .await
                .map_err(PortalError::from)?;
            if periods.is_empty() {
                return Ok("No accounting periods.".to_string());
            }
            let mut out = String::new();
            for p in &periods {
                writeln!(
                    out,
                    "#{:<4} {} to {}  net {:>14}  tax {:>12}  ({})",
                    p.id,
                    p.period_start,
                    p.period_end,
                    money(p.net_profit()),
                    money(p.tax_amount),
                    percent(p.tax_rate)
                )?;
            }
            Ok(out.trim_end().to_string())
        }
        Command::Suggest {
            employee,
            start,
            end,
            counters,
        } => {
            let counters = PerformanceCounters::from(counters);
            let (comp, calc) = suggest_and_save(repo, *employee, *start, *end, counters).await?;

            let mut out = String::new();
            writeln!(out, "Saved calculation #{} ({})", calc.id, calc.status.as_str())?;
            writeln!(out, "  Tier:              {}", comp.tier.as_str())?;
            writeln!(out, "  Base performance:  {}", money(comp.base_performance))?;
            writeln!(out, "  Revenue bonus:     {}", money(comp.revenue_bonus))?;
            writeln!(
                out,
                "  Salary:            {} (ceiling {})",
                money(comp.salary),
                money(comp.ceilings.salary)
            )?;
            write!(
                out,
                "  Bonus:             {} (ceiling {})",
                money(comp.bonus),
                money(comp.ceilings.bonus)
            )?;
            Ok(out)
        }
        Command::PayrollTotal { enterprise, start } => {
            let total = pending_payroll_cost(repo, *enterprise, *start).await?;
            Ok(format!("Pending payroll from {}: {}", start, money(total)))
        }
        Command::Dotation(DotationCommand::Submit {
            enterprise,
            start,
            end,
            by,
        }) => {
            let submission = submit_dotation(repo, *enterprise, *start, *end, *by).await?;
            Ok(format!(
                "Dotation report #{} submitted: {} entries, total {}",
                submission.report.id,
                submission.entries.len(),
                money(submission.report.total_amount)
            ))
        }
        Command::Login {
            email,
            password,
            fingerprint,
        } => {
            let outcome = DeviceBindingAuth::new(repo)
                .with_contact_hint(config.auth.contact_hint.clone())
                .login(email, password, fingerprint)
                .await
                .map_err(PortalError::from)?;
            let role = outcome
                .account
                .highest_role
                .map_or("none", |r| r.as_str());
            Ok(format!(
                "Logged in as {} <{}> (role: {}, device: {})",
                outcome.account.display_name,
                outcome.account.email,
                role,
                outcome.binding.reason()
            ))
        }
        Command::Fingerprint(signals) => {
            Ok(FingerprintSignals::from(signals).derive().to_string())
        }
        Command::Account(AccountCommand::Add {
            email,
            name,
            password,
            role,
        }) => {
            let email = validate_email(email)?;
            if name.trim().is_empty() {
                return Err(PortalError::validation("display name is required").into());
            }
            if password.is_empty() {
                return Err(PortalError::validation("password is required").into());
            }
            let account = repo
                .create_account(NewAccount {
                    email,
                    display_name: name.trim().to_string(),
                    password_hash: hash_password(password),
                })
                .await
                .map_err(PortalError::from)?;
            if let Some(role) = role {
                repo.assign_role(account.id, *role)
                    .await
                    .map_err(PortalError::from)?;
            }
            info!(account_id = account.id, "created account");
            Ok(format!(
                "Created account #{} <{}> (role: {})",
                account.id,
                account.email,
                role.map_or("none", |r| r.as_str())
            ))
        }
        Command::Account(AccountCommand::List { admin }) => {
            let accounts = DeviceBindingAuth::new(repo)
                .list_accounts(&admin.email, &admin.password)
                .await
                .map_err(PortalError::from)?;
            let mut out = String::new();
            for a in &accounts {
                writeln!(
                    out,
                    "#{:<4} {:<32} {:<20} role={:<10} bound={} resets={}",
                    a.id,
                    a.email,
                    a.display_name,
                    a.highest_role.map_or("none", |r| r.as_str()),
                    if a.has_hwid { "yes" } else { "no" },
                    a.hwid_reset_count
                )?;
            }
            Ok(out.trim_end().to_string())
        }
        Command::Account(AccountCommand::History { admin, account }) => {
            let attempts = DeviceBindingAuth::new(repo)
                .login_history(&admin.email, &admin.password, *account)
                .await
                .map_err(PortalError::from)?;
            if attempts.is_empty() {
                return Ok("No login attempts.".to_string());
            }
            let mut out = String::new();
            for a in &attempts {
                writeln!(
                    out,
                    "{}  {:<7} {:<20} {}",
                    a.attempted_at.format("%Y-%m-%d %H:%M:%S"),
                    if a.success { "ok" } else { "refused" },
                    a.reason,
                    a.fingerprint
                )?;
            }
            Ok(out.trim_end().to_string())
        }
        Command::ResetHwid { admin, account } => {
            let account = DeviceBindingAuth::new(repo)
                .reset_fingerprint(&admin.email, &admin.password, *account)
                .await
                .map_err(PortalError::from)?;
            Ok(format!(
                "Device binding cleared for <{}> (reset #{})",
                account.email, account.hwid_reset_count
            ))
        }
        Command::Enterprise(EnterpriseCommand::Add { guild, name }) => {
            validate_guild_id(guild)?;
            if name.trim().is_empty() {
                return Err(PortalError::validation("enterprise name is required").into());
            }
            let enterprise = repo
                .create_enterprise(NewEnterprise {
                    guild_id: guild.clone(),
                    name: name.trim().to_string(),
                })
                .await
                .map_err(PortalError::from)?;
            Ok(format!(
                "Created enterprise #{} {} (guild {})",
                enterprise.id, enterprise.name, enterprise.guild_id
            ))
        }
        Command::Enterprise(EnterpriseCommand::List) => {
            let enterprises = repo.list_enterprises().await.map_err(PortalError::from)?;
            if enterprises.is_empty() {
                return Ok("No enterprises.".to_string());
            }
            let mut out = String::new();
            for e in &enterprises {
                writeln!(out, "#{:<4} {:<24} guild {}", e.id, e.name, e.guild_id)?;
            }
            Ok(out.trim_end().to_string())
        }
        Command::Employee(EmployeeCommand::Add {
            enterprise,
            name,
            grade,
            salary,
            account,
        }) => {
            if name.trim().is_empty() {
                return Err(PortalError::validation("employee name is required").into());
            }
            let employee = repo
                .create_employee(NewEmployee {
                    enterprise_id: *enterprise,
                    account_id: *account,
                    name: name.trim().to_string(),
                    grade: grade.trim().to_string(),
                    salary: *salary,
                })
                .await
                .map_err(PortalError::from)?;
            Ok(format!(
                "Hired #{} {} as {} ({} tier)",
                employee.id,
                employee.name,
                employee.grade,
                employee.tier().as_str()
            ))
        }
        Command::Employee(EmployeeCommand::List { enterprise, all }) => {
            let employees = repo
                .list_employees(*enterprise, !*all)
                .await
                .map_err(PortalError::from)?;
            if employees.is_empty() {
                return Ok("No employees.".to_string());
            }
            let mut out = String::new();
            for e in &employees {
                writeln!(
                    out,
                    "#{:<4} {:<24} {:<12} {:>12}{}",
                    e.id,
                    e.name,
                    e.grade,
                    money(e.salary),
                    if e.is_active { "" } else { "  (inactive)" }
                )?;
            }
            Ok(out.trim_end().to_string())
        }
    }
}

async fn tax_report(
    repo: &dyn PortalRepository,
    guild: &str,
    gross: Decimal,
    expenses: Decimal,
) -> Result<String> {
    validate_guild_id(guild)?;
    let brackets = repo
        .get_tax_brackets(guild)
        .await
        .map_err(PortalError::from)?;
    let result = compute_tax(gross, expenses, &brackets).map_err(PortalError::from)?;

    let mut out = String::new();
    writeln!(out, "Net profit:        {}", money(result.net_profit))?;
    writeln!(
        out,
        "Bracket:           {} to {}",
        money(result.bracket.min_profit),
        money(result.bracket.max_profit)
    )?;
    writeln!(out, "Tax rate:          {}", percent(result.tax_rate))?;
    writeln!(out, "Tax amount:        {}", money(result.tax_amount))?;
    write!(out, "Profit after tax:  {}", money(result.profit_after_tax))?;
    Ok(out)
}

fn flat_tax_report(gross: Decimal) -> Result<String> {
    let b = compute_flat_tax(gross);

    let mut out = String::new();
    writeln!(out, "Gross income:      {}", money(b.gross_income))?;
    writeln!(out, "Federal:           {}", money(b.federal))?;
    writeln!(out, "State:             {}", money(b.state))?;
    writeln!(out, "Social security:   {}", money(b.social_security))?;
    writeln!(out, "Medicare:          {}", money(b.medicare))?;
    writeln!(out, "Total tax:         {}", money(b.total_tax))?;
    write!(out, "Net income:        {}", money(b.net_income))?;
    Ok(out)
}

fn money(d: Decimal) -> String {
    format!("{:.2}", d.round_dp(2))
}

fn percent(rate: Decimal) -> String {
    format!("{}%", (rate * Decimal::ONE_HUNDRED).normalize())
}
