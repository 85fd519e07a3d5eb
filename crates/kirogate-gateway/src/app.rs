use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tracing::warn;

use kirogate_accounts::{
    AccountPool, AccountStatus, KiroTokenProvider, KiroUsageProbe, TokenProvider, UsageProbe,
};
use kirogate_core::config::KirogateConfig;
use kirogate_core::GatewayError;
use kirogate_dispatch::Dispatcher;
use kirogate_logs::{LogSink, SqliteLogSink};
use kirogate_translate::model_map::{ModelMappingStore, StaticMappingStore};

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: KirogateConfig,
    pub pool: Arc<AccountPool>,
    pub tokens: Arc<KiroTokenProvider>,
    pub probe: KiroUsageProbe,
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(config: KirogateConfig) -> Result<Self, GatewayError> {
        let pool = AccountPool::load(&config.accounts.roster_path, config.accounts.selection)
            .map_err(|e| GatewayError::Config(format!("cannot load account roster: {e}")))?;
        let logs = Arc::new(
            SqliteLogSink::open(&config.logs.db_path)
                .map_err(|e| GatewayError::Config(format!("cannot open request log: {e}")))?,
        );
        let tokens = Arc::new(KiroTokenProvider::new(
            Arc::clone(&pool),
            config.upstream.region.clone(),
        ));
        let mappings: Option<Arc<dyn ModelMappingStore>> = if config.models.rules.is_empty() {
            None
        } else {
            Some(Arc::new(StaticMappingStore::new(
                config.models.rules.clone(),
            )))
        };
        let dispatcher = Dispatcher::new(
            &config.upstream,
            Arc::clone(&pool),
            Arc::clone(&tokens) as Arc<dyn TokenProvider>,
            logs as Arc<dyn LogSink>,
            mappings,
        )?;
        let probe = KiroUsageProbe::new(&config.upstream.region);
        Ok(Self {
            config,
            pool,
            tokens,
            probe,
            dispatcher,
        })
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/accounts", get(crate::http::accounts::accounts_handler))
        .route("/v1/messages", post(crate::http::messages::messages_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Periodically probe usage limits for every active account and store the
/// snapshot on the roster. Disabled when the interval is 0.
pub fn spawn_usage_refresh(state: &Arc<AppState>) {
    let secs = state.config.accounts.usage_refresh_secs;
    if secs == 0 {
        return;
    }
    let state = Arc::clone(state);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            for account in state.pool.snapshot() {
                if account.status != AccountStatus::Active {
                    continue;
                }
                let token = match state.tokens.ensure_valid_token(&account).await {
                    Ok(token) => token,
                    Err(e) => {
                        warn!(account = %account.name, error = %e, "usage refresh: token unavailable");
                        continue;
                    }
                };
                match state.probe.check_usage_limits(&token.token).await {
                    Ok(snapshot) => state.pool.update_usage(&account.id, snapshot),
                    Err(e) => {
                        warn!(account = %account.name, error = %e, "usage probe failed")
                    }
                }
            }
        }
    });
}
