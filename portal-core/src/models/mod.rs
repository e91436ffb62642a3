mod account;
mod accounting_period;
mod dotation;
mod employee;
mod enterprise;
mod salary_calculation;
mod tax_bracket;

pub use account::{Account, AccountSummary, AppRole, LoginAttempt, NewAccount, NewLoginAttempt};
pub use accounting_period::{AccountingPeriod, NewAccountingPeriod};
pub use dotation::{DotationEntry, DotationReport, NewDotationEntry, NewDotationReport};
pub use employee::{Employee, NewEmployee, Tier};
pub use enterprise::{Enterprise, NewEnterprise};
pub use salary_calculation::{
    CalculationStatus, NewSalaryCalculation, PerformanceCounters, SalaryCalculation,
};
pub use tax_bracket::{Ceilings, TaxBracket};
