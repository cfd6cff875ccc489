//! Capability layer for the ReadAgent pipeline.
//!
//! Provides:
//! - Capability contracts: boundary oracle, summarizer, page selector, answerer
//! - An explicit retry policy and a wrapper applying it to any capability
//! - An HTTP backend for OpenAI-compatible and Anthropic endpoints
//! - A deterministic mock backend for tests and dry runs

pub mod api;
pub mod capability;
pub mod error;
pub mod mock;
pub mod prompts;
pub mod retry;
pub mod tokens;

pub use api::{ApiConfig, ApiProvider, LlmBackend};
pub use capability::{Answerer, BoundaryOracle, Completion, PageSelector, Summarizer};
pub use error::CapabilityError;
pub use mock::MockBackend;
pub use retry::{RetryPolicy, Retrying};
pub use tokens::TokenCounter;
