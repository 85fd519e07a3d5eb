use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use kirogate_accounts::{AccountStatus, UsageSnapshot};

use crate::app::AppState;

/// Roster view for the admin surface. Credentials never leave the pool.
#[derive(Serialize)]
pub struct AccountView {
    pub id: String,
    pub name: String,
    pub status: AccountStatus,
    pub request_count: u64,
    pub error_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageSnapshot>,
}

/// GET /accounts — account snapshots without credentials.
pub async fn accounts_handler(State(state): State<Arc<AppState>>) -> Json<Vec<AccountView>> {
    let views = state
        .pool
        .snapshot()
        .into_iter()
        .map(|a| AccountView {
            id: a.id,
            name: a.name,
            status: a.status,
            request_count: a.request_count,
            error_count: a.error_count,
            created_at: a.created_at,
            last_used_at: a.last_used_at,
            usage: a.usage,
        })
        .collect();
    Json(views)
}
