use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Header of a payroll/bonus disbursement for one enterprise and period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DotationReport {
    pub id: i64,
    pub enterprise_id: i64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub total_amount: Decimal,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDotationReport {
    pub enterprise_id: i64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub total_amount: Decimal,
    pub created_by: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DotationEntry {
    pub id: i64,
    pub report_id: i64,
    pub employee_id: i64,
    pub salary: Decimal,
    pub bonus: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDotationEntry {
    pub report_id: i64,
    pub employee_id: i64,
    pub salary: Decimal,
    pub bonus: Decimal,
}
