use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Tier;

/// One row of a guild's bracket table.
///
/// The profit range is inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub guild_id: String,
    pub min_profit: Decimal,
    pub max_profit: Decimal,
    pub tax_rate: Decimal,
    pub max_employee_salary: Decimal,
    pub max_boss_salary: Decimal,
    pub max_employee_bonus: Decimal,
    pub max_boss_bonus: Decimal,
}

/// Salary and bonus caps that apply to one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ceilings {
    pub salary: Decimal,
    pub bonus: Decimal,
}

impl TaxBracket {
    /// Whether `profit` falls inside `[min_profit, max_profit]`.
    pub fn covers(&self, profit: Decimal) -> bool {
        self.min_profit <= profit && profit <= self.max_profit
    }

    pub fn ceilings(&self, tier: Tier) -> Ceilings {
        match tier {
            Tier::Manager => Ceilings {
                salary: self.max_boss_salary,
                bonus: self.max_boss_bonus,
            },
            Tier::Employee => Ceilings {
                salary: self.max_employee_salary,
                bonus: self.max_employee_bonus,
            },
        }
    }
}
