use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::usage::UsageSnapshot;

/// Account lifecycle state. Only `active` accounts are eligible for
/// selection; `cooldown` reverts to `active` on a timer, the other two only
/// change through explicit admin action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Cooldown,
    Invalid,
    Disabled,
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Cooldown => write!(f, "cooldown"),
            Self::Invalid => write!(f, "invalid"),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}

/// One upstream credential slot, as persisted in the roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    /// Opaque blob interpreted only by the token provider.
    pub credentials: serde_json::Value,
    #[serde(default = "default_status")]
    pub status: AccountStatus,
    #[serde(default)]
    pub request_count: u64,
    #[serde(default)]
    pub error_count: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageSnapshot>,
}

impl Account {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        credentials: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            credentials,
            status: AccountStatus::Active,
            request_count: 0,
            error_count: 0,
            created_at: Utc::now(),
            last_used_at: None,
            usage: None,
        }
    }
}

fn default_status() -> AccountStatus {
    AccountStatus::Active
}
