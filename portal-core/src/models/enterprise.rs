use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A guild-scoped organizational unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enterprise {
    pub id: i64,
    /// Discord guild snowflake the enterprise belongs to.
    pub guild_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEnterprise {
    pub guild_id: String,
    pub name: String,
}
