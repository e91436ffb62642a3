use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Fingerprint;

/// Portal access role. Ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AppRole {
    Member,
    Staff,
    Superstaff,
}

impl AppRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Staff => "staff",
            Self::Superstaff => "superstaff",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "member" => Some(Self::Member),
            "staff" => Some(Self::Staff),
            "superstaff" => Some(Self::Superstaff),
            _ => None,
        }
    }

    /// Roles allowed to run administrator operations.
    pub fn is_admin(&self) -> bool {
        *self == Self::Superstaff
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub hwid: Option<Fingerprint>,
    pub hwid_reset_count: i32,
    pub last_hwid_reset: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
}

/// Redacted account view for listings: no password hash, no fingerprint value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: i64,
    pub email: String,
    pub display_name: String,
    pub has_hwid: bool,
    pub hwid_reset_count: i32,
    pub last_hwid_reset: Option<DateTime<Utc>>,
    pub highest_role: Option<AppRole>,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            display_name: account.display_name.clone(),
            has_hwid: account.hwid.is_some(),
            hwid_reset_count: account.hwid_reset_count,
            last_hwid_reset: account.last_hwid_reset,
            highest_role: None,
        }
    }
}

/// Audit row for a login attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginAttempt {
    pub id: i64,
    pub account_id: i64,
    pub fingerprint: Fingerprint,
    pub success: bool,
    pub reason: String,
    pub attempted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLoginAttempt {
    pub account_id: i64,
    pub fingerprint: Fingerprint,
    pub success: bool,
    pub reason: String,
}
