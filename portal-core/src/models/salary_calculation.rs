use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalculationStatus {
    Pending,
    Validated,
    Paid,
}

impl CalculationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Validated => "validated",
            Self::Paid => "paid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "validated" => Some(Self::Validated),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }
}

/// Performance counters collected for one employee over one period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceCounters {
    pub run_count: u32,
    pub invoice_count: u32,
    pub sale_count: u32,
    pub total_revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryCalculation {
    pub id: i64,
    pub employee_id: i64,
    pub enterprise_id: i64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub counters: PerformanceCounters,
    pub calculated_salary: Decimal,
    pub calculated_bonus: Decimal,
    pub status: CalculationStatus,
    pub created_at: DateTime<Utc>,
}

/// For creating new calculations (no id or timestamps)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSalaryCalculation {
    pub employee_id: i64,
    pub enterprise_id: i64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub counters: PerformanceCounters,
    pub calculated_salary: Decimal,
    pub calculated_bonus: Decimal,
}
