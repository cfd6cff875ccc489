//! Error types shared across the readagent crates.

use thiserror::Error;

/// Error raised while loading or validating settings.
#[derive(Debug, Error)]
pub enum ReadAgentError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
