pub mod accounts;
pub mod health;
pub mod messages;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use kirogate_core::GatewayError;

/// Map a gateway error onto the client-facing HTTP surface. Upstream
/// failures pass their status through; everything else gets a fixed code.
pub fn error_response(err: &GatewayError) -> Response {
    let status = match err {
        GatewayError::UnsupportedModel(_) | GatewayError::EmptyMessages => {
            StatusCode::BAD_REQUEST
        }
        GatewayError::NoAccountAvailable => StatusCode::SERVICE_UNAVAILABLE,
        GatewayError::Token { .. } | GatewayError::Transport(_) => StatusCode::BAD_GATEWAY,
        GatewayError::Upstream { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        GatewayError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = json!({
        "type": "error",
        "error": {
            "type": err.code(),
            "message": err.to_string(),
        }
    });
    (status, Json(body)).into_response()
}
