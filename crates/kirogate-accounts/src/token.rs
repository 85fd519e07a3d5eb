//! Kiro bearer-token lifecycle.
//!
//! Auth flow:
//!   1. The roster stores an opaque credential blob per account
//!      (access + refresh token, expiry, machine id, profile ARN).
//!   2. Before each upstream call the dispatcher asks for a valid token.
//!   3. Tokens within 60 s of expiry are refreshed against the Kiro desktop
//!      auth endpoint; refreshed blobs go back to the pool for persistence.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::account::Account;
use crate::pool::AccountPool;

/// Refresh when the access token has less than this long to live.
const EXPIRY_MARGIN_MS: i64 = 60_000;
/// Assumed token lifetime when the refresh response carries no expiry.
const DEFAULT_TOKEN_TTL_MS: i64 = 3_600_000;

/// What the dispatcher needs from a credential: the bearer token plus the
/// header/envelope extras that ride along with it.
#[derive(Debug, Clone)]
pub struct BearerToken {
    pub token: String,
    pub machine_id: Option<String>,
    pub profile_arn: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("missing or malformed credentials: {0}")]
    Credentials(String),

    #[error("token refresh rejected ({status}): {message}")]
    Refresh { status: u16, message: String },

    #[error("malformed refresh response: {0}")]
    Response(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl TokenError {
    /// Persistent failures mark the account invalid; transient ones only
    /// surface to the client.
    pub fn is_persistent(&self) -> bool {
        match self {
            TokenError::Credentials(_) => true,
            TokenError::Refresh { status, .. } => (400..500).contains(status),
            TokenError::Response(_) | TokenError::Http(_) => false,
        }
    }
}

#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Produce a currently-valid bearer token for the account, refreshing if
    /// needed.
    async fn ensure_valid_token(&self, account: &Account) -> Result<BearerToken, TokenError>;
}

/// Credential blob layout inside `Account::credentials`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KiroCredentials {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (milliseconds) when the access token expires.
    pub expires_at: i64,
    #[serde(default)]
    pub machine_id: Option<String>,
    #[serde(default)]
    pub profile_arn: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

impl KiroCredentials {
    pub fn is_fresh(&self, now_millis: i64) -> bool {
        now_millis + EXPIRY_MARGIN_MS < self.expires_at
    }

    fn bearer(&self) -> BearerToken {
        BearerToken {
            token: self.access_token.clone(),
            machine_id: self.machine_id.clone(),
            profile_arn: self.profile_arn.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Seconds until expiry, when the endpoint reports a relative lifetime.
    #[serde(default)]
    expires_in: Option<i64>,
    /// Absolute expiry in epoch milliseconds, when reported directly.
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    profile_arn: Option<String>,
}

pub struct KiroTokenProvider {
    client: reqwest::Client,
    pool: Arc<AccountPool>,
    /// In-memory view of the freshest credentials per account id.
    cache: DashMap<String, KiroCredentials>,
    default_region: String,
}

impl KiroTokenProvider {
    pub fn new(pool: Arc<AccountPool>, default_region: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            pool,
            cache: DashMap::new(),
            default_region: default_region.into(),
        }
    }

    fn refresh_url(&self, creds: &KiroCredentials) -> String {
        let region = creds.region.as_deref().unwrap_or(&self.default_region);
        format!("https://prod.{region}.auth.desktop.kiro.dev/refreshToken")
    }

    async fn refresh(&self, creds: &KiroCredentials) -> Result<KiroCredentials, TokenError> {
        let resp = self
            .client
            .post(self.refresh_url(creds))
            .json(&serde_json::json!({ "refreshToken": creds.refresh_token }))
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(TokenError::Refresh { status, message });
        }

        let body: RefreshResponse = resp
            .json()
            .await
            .map_err(|e| TokenError::Response(e.to_string()))?;

        let now = Utc::now().timestamp_millis();
        let expires_at = body
            .expires_at
            .or_else(|| body.expires_in.map(|secs| now + secs * 1000))
            .unwrap_or(now + DEFAULT_TOKEN_TTL_MS);

        Ok(KiroCredentials {
            access_token: body.access_token,
            refresh_token: body.refresh_token.unwrap_or_else(|| creds.refresh_token.clone()),
            expires_at,
            machine_id: creds.machine_id.clone(),
            profile_arn: body.profile_arn.or_else(|| creds.profile_arn.clone()),
            region: creds.region.clone(),
        })
    }
}

#[async_trait]
impl TokenProvider for KiroTokenProvider {
    async fn ensure_valid_token(&self, account: &Account) -> Result<BearerToken, TokenError> {
        let creds = match self.cache.get(&account.id) {
            Some(entry) => entry.value().clone(),
            None => serde_json::from_value(account.credentials.clone())
                .map_err(|e| TokenError::Credentials(e.to_string()))?,
        };

        let now = Utc::now().timestamp_millis();
        if creds.is_fresh(now) {
            self.cache.insert(account.id.clone(), creds.clone());
            return Ok(creds.bearer());
        }

        info!(account = %account.name, "refreshing Kiro access token");
        let refreshed = self.refresh(&creds).await?;
        self.cache.insert(account.id.clone(), refreshed.clone());

        // the pool is the sole roster writer, so persistence goes through it
        match serde_json::to_value(&refreshed) {
            Ok(blob) => self.pool.store_credentials(&account.id, blob),
            Err(e) => warn!(account = %account.name, error = %e, "failed to serialize refreshed credentials"),
        }

        Ok(refreshed.bearer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(expires_at: i64) -> KiroCredentials {
        KiroCredentials {
            access_token: "tok".into(),
            refresh_token: "ref".into(),
            expires_at,
            machine_id: None,
            profile_arn: None,
            region: None,
        }
    }

    #[test]
    fn freshness_margin() {
        let now = 1_000_000;
        assert!(creds(now + EXPIRY_MARGIN_MS + 1).is_fresh(now));
        assert!(!creds(now + EXPIRY_MARGIN_MS).is_fresh(now));
        assert!(!creds(now - 1).is_fresh(now));
    }

    #[test]
    fn persistent_failure_classification() {
        assert!(TokenError::Credentials("bad".into()).is_persistent());
        assert!(TokenError::Refresh {
            status: 403,
            message: "invalid_grant".into()
        }
        .is_persistent());
        assert!(!TokenError::Refresh {
            status: 503,
            message: "try later".into()
        }
        .is_persistent());
    }

    #[test]
    fn credentials_blob_parses_camel_case() {
        let blob = serde_json::json!({
            "accessToken": "a",
            "refreshToken": "r",
            "expiresAt": 123,
            "machineId": "m",
            "profileArn": "arn:aws:x"
        });
        let creds: KiroCredentials = serde_json::from_value(blob).unwrap();
        assert_eq!(creds.access_token, "a");
        assert_eq!(creds.expires_at, 123);
        assert_eq!(creds.machine_id.as_deref(), Some("m"));
        assert_eq!(creds.profile_arn.as_deref(), Some("arn:aws:x"));
        assert!(creds.region.is_none());
    }

    #[test]
    fn malformed_blob_is_a_credentials_error() {
        let account = Account::new("a", "n", serde_json::json!({"nope": true}));
        let err: Result<KiroCredentials, _> = serde_json::from_value(account.credentials);
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn fresh_token_avoids_network() {
        let pool = AccountPool::with_accounts(
            Vec::new(),
            kirogate_core::config::SelectionStrategy::RoundRobin,
        );
        let provider = KiroTokenProvider::new(pool, "us-east-1");
        let far_future = Utc::now().timestamp_millis() + 10 * 60 * 1000;
        let account = Account::new(
            "a",
            "n",
            serde_json::to_value(creds(far_future)).unwrap(),
        );
        let token = provider.ensure_valid_token(&account).await.unwrap();
        assert_eq!(token.token, "tok");
    }

    #[test]
    fn refresh_url_prefers_credential_region() {
        let pool = AccountPool::with_accounts(
            Vec::new(),
            kirogate_core::config::SelectionStrategy::RoundRobin,
        );
        let provider = KiroTokenProvider::new(pool, "us-east-1");
        let mut c = creds(0);
        assert_eq!(
            provider.refresh_url(&c),
            "https://prod.us-east-1.auth.desktop.kiro.dev/refreshToken"
        );
        c.region = Some("eu-west-1".into());
        assert_eq!(
            provider.refresh_url(&c),
            "https://prod.eu-west-1.auth.desktop.kiro.dev/refreshToken"
        );
    }
}
