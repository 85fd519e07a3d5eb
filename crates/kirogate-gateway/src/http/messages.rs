//! POST /v1/messages — Anthropic-compatible chat endpoint.
//!
//! The upstream byte stream is returned verbatim; response parsing is the
//! downstream decoder's job. The per-request tool-name map travels in a
//! response header so the decoder can translate tool-use events back to
//! client-facing names.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::info;

use kirogate_dispatch::DispatchOutcome;
use kirogate_translate::client::ChatRequest;

use crate::app::AppState;

pub const TOOL_NAMES_HEADER: &str = "x-kirogate-tool-names";

pub async fn messages_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Response {
    info!(model = %request.model, messages = request.messages.len(), "chat request");
    match state.dispatcher.dispatch(&request).await {
        Ok(outcome) => stream_response(outcome),
        Err(e) => crate::http::error_response(&e),
    }
}

fn stream_response(outcome: DispatchOutcome) -> Response {
    let DispatchOutcome {
        response,
        tool_names,
        ..
    } = outcome;

    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type);
    if let Ok(map) = serde_json::to_string(&tool_names) {
        if let Ok(value) = HeaderValue::from_str(&map) {
            builder = builder.header(TOOL_NAMES_HEADER, value);
        }
    }

    builder
        .body(Body::from_stream(response.bytes_stream()))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
