use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health — liveness probe with pool counts.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let (active, total) = state.pool.counts();
    Json(json!({
        "status": "ok",
        "upstream_region": state.config.upstream.region,
        "accounts": {
            "active": active,
            "total": total,
        },
    }))
}
