//! The dispatcher walks one request through its whole life: translate,
//! select an account, obtain a token, call the upstream, and fold the
//! outcome back into the pool and the request log.
//!
//! The pool lock is never held across any of the awaits here; only the
//! selected account snapshot travels forward.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, warn};

use kirogate_accounts::{Account, AccountPool, TokenProvider};
use kirogate_core::config::UpstreamConfig;
use kirogate_core::GatewayError;
use kirogate_logs::{LogSink, RequestLogRow};
use kirogate_translate::client::ChatRequest;
use kirogate_translate::model_map::ModelMappingStore;
use kirogate_translate::translate::translate;

use crate::headers::{build_headers, fresh_machine_id, upstream_url};
use crate::summary::summarize;

/// A successful dispatch: the upstream response handle, still streaming,
/// plus everything the response decoder needs.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub response: reqwest::Response,
    /// Original → sanitized tool names for translating tool-use events back.
    pub tool_names: HashMap<String, String>,
    pub account_id: String,
    pub model_id: String,
    pub conversation_id: String,
}

pub struct Dispatcher {
    client: reqwest::Client,
    pool: Arc<AccountPool>,
    tokens: Arc<dyn TokenProvider>,
    logs: Arc<dyn LogSink>,
    mappings: Option<Arc<dyn ModelMappingStore>>,
    url: String,
    region: String,
    kiro_version: String,
}

impl Dispatcher {
    pub fn new(
        upstream: &UpstreamConfig,
        pool: Arc<AccountPool>,
        tokens: Arc<dyn TokenProvider>,
        logs: Arc<dyn LogSink>,
        mappings: Option<Arc<dyn ModelMappingStore>>,
    ) -> Result<Self, GatewayError> {
        let mut builder = reqwest::Client::builder();
        if let Some(proxy) = &upstream.proxy_url {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| GatewayError::Config(format!("invalid proxy URL: {e}")))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| GatewayError::Config(e.to_string()))?;
        Ok(Self {
            client,
            pool,
            tokens,
            logs,
            mappings,
            url: upstream
                .endpoint
                .clone()
                .unwrap_or_else(|| upstream_url(&upstream.region)),
            region: upstream.region.clone(),
            kiro_version: upstream.kiro_version.clone(),
        })
    }

    /// Dispatch one client request. On 2xx the caller receives the live
    /// response stream; every other outcome is a `GatewayError` with the
    /// pool already updated and a log row written.
    pub async fn dispatch(&self, request: &ChatRequest) -> Result<DispatchOutcome, GatewayError> {
        // translation failures precede account work and leave no log row
        let translation = translate(request, self.mappings.as_deref())?;
        let model_id = translation
            .request
            .conversation_state
            .current_message
            .user_input_message
            .model_id
            .clone();
        let conversation_id = translation.request.conversation_state.conversation_id.clone();

        let Some(account) = self.pool.select_account() else {
            self.insert_log(LogContext {
                account: None,
                model: &request.model,
                model_id: &model_id,
                conversation_id: &conversation_id,
                status_code: None,
                error: Some("no active account available".to_string()),
                started: Instant::now(),
            });
            return Err(GatewayError::NoAccountAvailable);
        };
        debug!(account = %account.name, model_id = %model_id, "dispatching request");
        let started = Instant::now();

        let token = match self.tokens.ensure_valid_token(&account).await {
            Ok(token) => token,
            Err(e) => {
                let persistent = e.is_persistent();
                if persistent {
                    warn!(account = %account.name, error = %e, "persistent token failure, marking account invalid");
                    self.pool.mark_invalid(&account.id);
                }
                self.insert_log(LogContext {
                    account: Some(&account),
                    model: &request.model,
                    model_id: &model_id,
                    conversation_id: &conversation_id,
                    status_code: None,
                    error: Some(e.to_string()),
                    started,
                });
                return Err(GatewayError::Token {
                    account_id: account.id.clone(),
                    message: e.to_string(),
                    persistent,
                });
            }
        };

        let mut envelope = translation.request;
        envelope.profile_arn = token.profile_arn.clone();
        let machine_id = token
            .machine_id
            .clone()
            .unwrap_or_else(fresh_machine_id);

        let headers = build_headers(&token.token, &machine_id, &self.region, &self.kiro_version)
            .map_err(|e| GatewayError::Transport(format!("invalid header value: {e}")))?;

        let result = self
            .client
            .post(&self.url)
            .headers(headers)
            .json(&envelope)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.pool.record_error(&account.id, false);
                self.insert_log(LogContext {
                    account: Some(&account),
                    model: &request.model,
                    model_id: &model_id,
                    conversation_id: &conversation_id,
                    status_code: None,
                    error: Some(e.to_string()),
                    started,
                });
                return Err(GatewayError::Transport(e.to_string()));
            }
        };

        let status = response.status();
        if status.is_success() {
            self.insert_log(LogContext {
                account: Some(&account),
                model: &request.model,
                model_id: &model_id,
                conversation_id: &conversation_id,
                status_code: Some(status.as_u16()),
                error: None,
                started,
            });
            return Ok(DispatchOutcome {
                response,
                tool_names: translation.tool_names,
                account_id: account.id,
                model_id,
                conversation_id,
            });
        }

        let body = response.text().await.unwrap_or_default();
        let rate_limited = status.as_u16() == 429;
        self.pool.record_error(&account.id, rate_limited);
        warn!(
            account = %account.name,
            status = status.as_u16(),
            rate_limited,
            "upstream rejected request"
        );
        let summary = summarize(&serde_json::to_value(&envelope).unwrap_or_default());
        self.insert_log(LogContext {
            account: Some(&account),
            model: &request.model,
            model_id: &model_id,
            conversation_id: &conversation_id,
            status_code: Some(status.as_u16()),
            error: Some(format!("upstream {}: {}", status.as_u16(), body)),
            started,
        });
        Err(GatewayError::Upstream {
            status: status.as_u16(),
            body,
            summary,
        })
    }

    fn insert_log(&self, ctx: LogContext<'_>) {
        let row = RequestLogRow {
            created_at: Utc::now(),
            account_id: ctx.account.map(|a| a.id.clone()).unwrap_or_default(),
            account_name: ctx.account.map(|a| a.name.clone()).unwrap_or_default(),
            model: ctx.model.to_string(),
            model_id: ctx.model_id.to_string(),
            conversation_id: ctx.conversation_id.to_string(),
            success: ctx.error.is_none(),
            status_code: ctx.status_code,
            error: ctx.error,
            duration_ms: ctx.started.elapsed().as_millis() as u64,
        };
        if let Err(e) = self.logs.insert_log(&row) {
            warn!(error = %e, "failed to insert request log row");
        }
    }
}

struct LogContext<'a> {
    account: Option<&'a Account>,
    model: &'a str,
    model_id: &'a str,
    conversation_id: &'a str,
    status_code: Option<u16>,
    error: Option<String>,
    started: Instant,
}
