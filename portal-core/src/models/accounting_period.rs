use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One reporting cycle of an enterprise's books.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountingPeriod {
    pub id: i64,
    pub enterprise_id: i64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,

    // User-provided values
    pub gross_revenue: Decimal,
    pub deductible_expenses: Decimal,
    pub bank_balance: Decimal,
    pub employee_count: i32,

    // Calculated values
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub profit_after_tax: Decimal,

    pub created_at: DateTime<Utc>,
}

impl AccountingPeriod {
    /// Gross revenue minus deductible expenses. Not floored at zero.
    pub fn net_profit(&self) -> Decimal {
        self.gross_revenue - self.deductible_expenses
    }
}

/// For creating new periods (no id or timestamps)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccountingPeriod {
    pub enterprise_id: i64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub gross_revenue: Decimal,
    pub deductible_expenses: Decimal,
    pub bank_balance: Decimal,
    pub employee_count: i32,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub profit_after_tax: Decimal,
}

impl NewAccountingPeriod {
    pub fn net_profit(&self) -> Decimal {
        self.gross_revenue - self.deductible_expenses
    }
}
