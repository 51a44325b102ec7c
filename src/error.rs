//! Error handling for the pipewatch crate.

use std::time::Duration;

/// A specialized `Result` type for pipewatch operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

/// The main error type for monitoring sessions and their surfaces.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Invalid configuration, rejected before monitoring begins
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Narration request failed
    #[error("Narration failed: {0}")]
    Generation(#[from] GenerationError),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),
}

impl MonitorError {
    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }

    /// Whether this error must stop a session from starting.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Generation(_))
    }
}

/// Failure of an external text-generation call.
///
/// Always local to a single tick: the session records it and keeps sampling.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The service could not be reached (DNS, TLS, connection reset, ...)
    #[error("text generation service unreachable: {0}")]
    Transport(#[source] reqwest::Error),

    /// The service refused the request because of quota or rate limits
    #[error("text generation rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// The service answered with a non-success status
    #[error("text generation service returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// The response body could not be understood
    #[error("malformed text generation response: {0}")]
    Malformed(String),

    /// The service answered but produced no text
    #[error("text generation returned an empty response")]
    EmptyResponse,

    /// No answer within the configured budget
    #[error("text generation timed out after {0:?}")]
    TimedOut(Duration),

    /// Any other delegate failure, carried as-is
    #[error(transparent)]
    Delegate(Box<dyn std::error::Error + Send + Sync>),
}

impl GenerationError {
    /// Wrap an arbitrary delegate error.
    pub fn delegate(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Delegate(err.into())
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Transport(err)
        }
    }
}
