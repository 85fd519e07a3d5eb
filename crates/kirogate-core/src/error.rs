use thiserror::Error;

/// Error taxonomy for the whole gateway. Translation errors are raised before
/// any account work; dispatch errors always leave a request-log row behind.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("unsupported model: {0}")]
    UnsupportedModel(String),

    #[error("messages must not be empty")]
    EmptyMessages,

    #[error("no active account available")]
    NoAccountAvailable,

    #[error("token error for account {account_id}: {message}")]
    Token {
        account_id: String,
        message: String,
        /// Persistent failures (e.g. a rejected refresh token) mark the
        /// account invalid; transient ones only surface to the client.
        persistent: bool,
    },

    #[error("upstream returned {status}: {body}")]
    Upstream {
        status: u16,
        body: String,
        /// Bounded structural trace of the request envelope, safe to log.
        summary: serde_json::Value,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    /// Short error code string sent to clients in error response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::UnsupportedModel(_) => "unsupported_model",
            GatewayError::EmptyMessages => "empty_messages",
            GatewayError::NoAccountAvailable => "no_account_available",
            GatewayError::Token { .. } => "token_error",
            GatewayError::Upstream { .. } => "upstream_error",
            GatewayError::Transport(_) => "transport_error",
            GatewayError::Config(_) => "config_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
