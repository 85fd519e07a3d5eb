//! Usage-quota probing against the Kiro desktop auth service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Quota snapshot as reported by the upstream usage endpoint. Stored on the
/// account for the admin surface; never consulted during selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    #[serde(default)]
    pub usage_limit: Option<f64>,
    #[serde(default)]
    pub current_usage: Option<f64>,
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub subscription_type: Option<String>,
    #[serde(default)]
    pub next_reset: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum UsageError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("usage probe rejected ({status}): {message}")]
    Probe { status: u16, message: String },
}

#[async_trait]
pub trait UsageProbe: Send + Sync {
    async fn check_usage_limits(&self, token: &str) -> Result<UsageSnapshot, UsageError>;
}

pub struct KiroUsageProbe {
    client: reqwest::Client,
    url: String,
}

impl KiroUsageProbe {
    pub fn new(region: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("https://prod.{region}.auth.desktop.kiro.dev/usage"),
        }
    }
}

#[async_trait]
impl UsageProbe for KiroUsageProbe {
    async fn check_usage_limits(&self, token: &str) -> Result<UsageSnapshot, UsageError> {
        let resp = self
            .client
            .get(&self.url)
            .bearer_auth(token)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(UsageError::Probe { status, message });
        }

        Ok(resp.json().await?)
    }
}
