//! # readagent-types
//!
//! Shared domain types for the ReadAgent paging/gisting pipeline.
//!
//! - Documents: immutable source text with a stable content-derived id
//! - Sentences and Pages: the unit of segmentation and of retrieval
//! - Gists: compressed page text, positionally aligned with pages
//! - Questions and records: dataset input and answer/error log output
//! - Settings: layered configuration

pub mod config;
pub mod document;
pub mod error;
pub mod page;
pub mod question;
pub mod record;

pub use config::{
    BatchPolicy, LlmSettings, LookupConfig, PaginationConfig, RetrySettings, RunnerSettings,
    Settings,
};
pub use document::Document;
pub use error::ReadAgentError;
pub use page::{count_words, Gist, Page, Sentence};
pub use question::{multiple_choice_text, multiple_choice_text_unnumbered, Question};
pub use record::{extract_choice, AnswerRecord, ErrorRecord};
