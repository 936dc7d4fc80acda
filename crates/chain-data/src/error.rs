//! Error type for provider operations.

/// Error type for chain data operations.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// Stored without the request URL, which carries the provider key.
    #[error("HTTP transport error: {0}")]
    Http(reqwest::Error),
    #[error("provider returned HTTP status {0}")]
    Status(u16),
    #[error("provider rate limit exceeded")]
    RateLimited,
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("{method} timed out")]
    Timeout { method: String },
    #[error("malformed provider response: {0}")]
    Decode(String),
    #[error("invalid provider configuration: {0}")]
    Config(String),
}

impl ChainError {
    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ChainError::RateLimited | ChainError::Timeout { .. } => true,
            ChainError::Status(code) => *code >= 500,
            ChainError::Http(e) => e.is_connect(),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ChainError {
    fn from(err: reqwest::Error) -> Self {
        ChainError::Http(err.without_url())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::Decode(err.to_string())
    }
}

/// Result type for chain data operations.
pub type ChainResult<T> = Result<T, ChainError>;
