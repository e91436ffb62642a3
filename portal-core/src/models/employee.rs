use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Grades that put an employee on the manager ceilings.
///
/// Compared against the trimmed, lowercased grade label.
const MANAGER_GRADES: &[&str] = &["patron", "co-patron"];

/// Ceiling tier derived from an employee's grade label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    Manager,
    Employee,
}

impl Tier {
    pub fn from_grade(grade: &str) -> Self {
        let normalized = grade.trim().to_lowercase();
        if MANAGER_GRADES.contains(&normalized.as_str()) {
            Self::Manager
        } else {
            Self::Employee
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manager => "manager",
            Self::Employee => "employee",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub enterprise_id: i64,
    pub account_id: Option<i64>,
    pub name: String,
    /// Free-text role label, e.g. "patron", "co-patron", "employe".
    pub grade: String,
    /// Current base salary.
    pub salary: Decimal,
    pub is_active: bool,
}

impl Employee {
    pub fn tier(&self) -> Tier {
        Tier::from_grade(&self.grade)
    }
}

/// For creating new employees (no id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmployee {
    pub enterprise_id: i64,
    pub account_id: Option<i64>,
    pub name: String,
    pub grade: String,
    pub salary: Decimal,
}
