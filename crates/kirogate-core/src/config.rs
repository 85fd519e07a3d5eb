use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8990;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_KIRO_VERSION: &str = "0.8.0";

/// Top-level config (kirogate.toml + KIROGATE_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KirogateConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub accounts: AccountsConfig,
    #[serde(default)]
    pub logs: LogsConfig,
    #[serde(default)]
    pub models: ModelsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

/// Upstream Kiro/CodeWhisperer endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_region")]
    pub region: String,
    /// Reported in the upstream user-agent headers.
    #[serde(default = "default_kiro_version")]
    pub kiro_version: String,
    /// Optional HTTPS proxy URL; routes all upstream traffic when set.
    pub proxy_url: Option<String>,
    /// Override the full upstream endpoint URL. Defaults to the regional
    /// `generateAssistantResponse` endpoint; mainly for staging and tests.
    pub endpoint: Option<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            kiro_version: DEFAULT_KIRO_VERSION.to_string(),
            proxy_url: None,
            endpoint: None,
        }
    }
}

/// How `select_account` picks from the active set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionStrategy {
    #[default]
    RoundRobin,
    Random,
    LeastUsed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountsConfig {
    /// JSON array of accounts, rewritten by the pool on every mutation.
    #[serde(default = "default_roster_path")]
    pub roster_path: String,
    #[serde(default)]
    pub selection: SelectionStrategy,
    /// Seconds between background usage-limit probes. 0 disables the task.
    #[serde(default)]
    pub usage_refresh_secs: u64,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            roster_path: default_roster_path(),
            selection: SelectionStrategy::default(),
            usage_refresh_secs: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// How a single model-mapping rule matches a client-supplied label.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MatchType {
    Exact,
    #[default]
    Contains,
    Prefix,
    Suffix,
}

/// One entry of the model-mapping rule table. Rules are tried in descending
/// priority; the first enabled match wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMappingRule {
    pub pattern: String,
    pub internal_id: String,
    #[serde(default)]
    pub match_type: MatchType,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "bool_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModelsConfig {
    /// Empty table means the built-in substring fallback is used.
    #[serde(default)]
    pub rules: Vec<ModelMappingRule>,
}

fn bool_true() -> bool {
    true
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_region() -> String {
    DEFAULT_REGION.to_string()
}
fn default_kiro_version() -> String {
    DEFAULT_KIRO_VERSION.to_string()
}
fn default_roster_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.kirogate/accounts.json", home)
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.kirogate/requests.db", home)
}

impl KirogateConfig {
    /// Load config from a TOML file with KIROGATE_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.kirogate/kirogate.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: KirogateConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("KIROGATE_").split("_"))
            .extract()
            .map_err(|e| crate::error::GatewayError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.kirogate/kirogate.toml", home)
}
