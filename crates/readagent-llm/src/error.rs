//! Capability error types.

use thiserror::Error;

/// Error returned by any external capability invocation.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Timeout waiting for response")]
    Timeout,

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Empty input")]
    EmptyInput,
}

impl CapabilityError {
    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            CapabilityError::RateLimitExceeded
            | CapabilityError::Timeout
            | CapabilityError::Transport(_) => true,
            CapabilityError::Http { status, .. } => *status >= 500,
            CapabilityError::Parse(_) | CapabilityError::Config(_) | CapabilityError::EmptyInput => {
                false
            }
        }
    }
}

impl From<reqwest::Error> for CapabilityError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CapabilityError::Timeout
        } else {
            CapabilityError::Transport(err.to_string())
        }
    }
}
