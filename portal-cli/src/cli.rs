use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use portal_core::auth::{Fingerprint, FingerprintSignals};
use portal_core::validation::{parse_date, parse_non_negative_amount};
use portal_core::{AppRole, PerformanceCounters};
use rust_decimal::Decimal;

use crate::config::{DEFAULT_CONFIG_FILE, Overrides};

/// Guild enterprise portal administration.
///
/// Taxes accounting periods against the guild's bracket table, suggests
/// salaries and bonuses, submits dotations and manages device-bound accounts.
#[derive(Debug, Parser)]
#[command(name = "portal", version, about)]
pub struct Cli {
    /// Configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Database backend, overriding the config file.
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Database connection string, overriding the config file.
    /// For SQLite this is a file path (e.g. `portal.db`) or `:memory:`.
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Log level or EnvFilter directive, overriding the config file.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            backend: self.backend.clone(),
            db: self.db.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Tax a net profit with a guild's bracket table.
    Tax {
        #[arg(long)]
        guild: String,
        #[arg(long, value_parser = money)]
        gross: Decimal,
        #[arg(long, value_parser = money, default_value = "0")]
        expenses: Decimal,
    },

    /// Flat-rate payroll tax breakdown of a gross income.
    FlatTax {
        #[arg(value_parser = money)]
        gross: Decimal,
    },

    /// Accounting periods.
    #[command(subcommand)]
    Period(PeriodCommand),

    /// Suggest a salary and bonus and save it as pending.
    Suggest {
        #[arg(long)]
        employee: i64,
        #[arg(long, value_parser = day)]
        start: NaiveDate,
        #[arg(long, value_parser = day)]
        end: NaiveDate,
        #[command(flatten)]
        counters: CounterArgs,
    },

    /// Total of pending salaries and bonuses for a period.
    PayrollTotal {
        #[arg(long)]
        enterprise: i64,
        #[arg(long, value_parser = day)]
        start: NaiveDate,
    },

    /// Dotation reports.
    #[command(subcommand)]
    Dotation(DotationCommand),

    /// Log in with email, password and device fingerprint.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Fingerprint hash, as printed by `portal fingerprint`.
        #[arg(long)]
        fingerprint: Fingerprint,
    },

    /// Derive a device fingerprint from browser signals.
    Fingerprint(SignalArgs),

    /// Portal accounts.
    #[command(subcommand)]
    Account(AccountCommand),

    /// Clear an account's device binding (superstaff only).
    ResetHwid {
        #[command(flatten)]
        admin: AdminArgs,
        #[arg(long)]
        account: i64,
    },

    /// Enterprises.
    #[command(subcommand)]
    Enterprise(EnterpriseCommand),

    /// Employees.
    #[command(subcommand)]
    Employee(EmployeeCommand),
}

#[derive(Debug, Subcommand)]
pub enum PeriodCommand {
    /// Tax and record an accounting period.
    Record {
        #[arg(long)]
        enterprise: i64,
        #[arg(long, value_parser = day)]
        start: NaiveDate,
        #[arg(long, value_parser = day)]
        end: NaiveDate,
        #[arg(long, value_parser = money)]
        gross: Decimal,
        #[arg(long, value_parser = money, default_value = "0")]
        expenses: Decimal,
        #[arg(long, value_parser = money, default_value = "0")]
        bank: Decimal,
        #[arg(long, default_value_t = 0)]
        employees: i32,
    },

    /// List an enterprise's periods, most recent first.
    List {
        #[arg(long)]
        enterprise: i64,
    },
}

#[derive(Debug, Subcommand)]
pub enum DotationCommand {
    /// Turn a period's pending calculations into a dotation report.
    Submit {
        #[arg(long)]
        enterprise: i64,
        #[arg(long, value_parser = day)]
        start: NaiveDate,
        #[arg(long, value_parser = day)]
        end: NaiveDate,
        /// Account id recorded as the report's author.
        #[arg(long)]
        by: Option<i64>,
    },
}

#[derive(Debug, Subcommand)]
pub enum AccountCommand {
    /// Create an account.
    Add {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        password: String,
        #[arg(long, value_parser = role)]
        role: Option<AppRole>,
    },

    /// Redacted account listing (superstaff only).
    List {
        #[command(flatten)]
        admin: AdminArgs,
    },

    /// Login attempts for an account, most recent first (superstaff only).
    History {
        #[command(flatten)]
        admin: AdminArgs,
        #[arg(long)]
        account: i64,
    },
}

#[derive(Debug, Subcommand)]
pub enum EnterpriseCommand {
    Add {
        /// Discord guild id.
        #[arg(long)]
        guild: String,
        #[arg(long)]
        name: String,
    },
    List,
}

#[derive(Debug, Subcommand)]
pub enum EmployeeCommand {
    Add {
        #[arg(long)]
        enterprise: i64,
        #[arg(long)]
        name: String,
        /// Grade label; "patron" and "co-patron" get manager ceilings.
        #[arg(long)]
        grade: String,
        #[arg(long, value_parser = money, default_value = "0")]
        salary: Decimal,
        /// Linked portal account.
        #[arg(long)]
        account: Option<i64>,
    },
    List {
        #[arg(long)]
        enterprise: i64,
        /// Include inactive employees.
        #[arg(long, default_value_t = false)]
        all: bool,
    },
}

/// Credentials of the superstaff account acting on others.
#[derive(Debug, Clone, Args)]
pub struct AdminArgs {
    /// Administrator's email.
    #[arg(long = "admin")]
    pub email: String,
    /// Administrator's password.
    #[arg(long = "admin-password")]
    pub password: String,
}

#[derive(Debug, Clone, Args)]
pub struct CounterArgs {
    #[arg(long, default_value_t = 0)]
    pub runs: u32,
    #[arg(long, default_value_t = 0)]
    pub invoices: u32,
    #[arg(long, default_value_t = 0)]
    pub sales: u32,
    #[arg(long, value_parser = money, default_value = "0")]
    pub revenue: Decimal,
}

impl From<&CounterArgs> for PerformanceCounters {
    fn from(args: &CounterArgs) -> Self {
        PerformanceCounters {
            run_count: args.runs,
            invoice_count: args.invoices,
            sale_count: args.sales,
            total_revenue: args.revenue,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct SignalArgs {
    #[arg(long, default_value = "")]
    pub canvas: String,
    #[arg(long, default_value_t = 0)]
    pub screen_width: u32,
    #[arg(long, default_value_t = 0)]
    pub screen_height: u32,
    #[arg(long, default_value_t = 24)]
    pub color_depth: u32,
    #[arg(long, default_value = "")]
    pub timezone: String,
    #[arg(long, default_value = "")]
    pub language: String,
    #[arg(long, default_value = "")]
    pub platform: String,
    #[arg(long, default_value = "")]
    pub gpu_vendor: String,
    #[arg(long, default_value = "")]
    pub gpu_renderer: String,
    #[arg(long, default_value_t = 0)]
    pub audio_inputs: u32,
    #[arg(long, default_value_t = 0)]
    pub audio_outputs: u32,
    #[arg(long, default_value_t = 0)]
    pub video_inputs: u32,
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub timezone_offset: i32,
}

impl From<&SignalArgs> for FingerprintSignals {
    fn from(args: &SignalArgs) -> Self {
        FingerprintSignals {
            canvas_data: args.canvas.clone(),
            screen_width: args.screen_width,
            screen_height: args.screen_height,
            color_depth: args.color_depth,
            timezone: args.timezone.clone(),
            language: args.language.clone(),
            platform: args.platform.clone(),
            gpu_vendor: args.gpu_vendor.clone(),
            gpu_renderer: args.gpu_renderer.clone(),
            audio_inputs: args.audio_inputs,
            audio_outputs: args.audio_outputs,
            video_inputs: args.video_inputs,
            timezone_offset_minutes: args.timezone_offset,
        }
    }
}

fn money(s: &str) -> Result<Decimal, String> {
    parse_non_negative_amount("amount", s).map_err(|e| e.to_string())
}

fn day(s: &str) -> Result<NaiveDate, String> {
    parse_date("date", s).map_err(|e| e.to_string())
}

fn role(s: &str) -> Result<AppRole, String> {
    AppRole::parse(s).ok_or_else(|| format!("unknown role '{s}' (member, staff, superstaff)"))
}
