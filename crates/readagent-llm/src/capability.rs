//! Capability contracts the pipeline depends on.
//!
//! Each capability takes structured text and returns free-form text.
//! Backends are interchangeable; the pipeline only sees these traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CapabilityError;

/// Free-form response plus the input tokens it consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub used_tokens: usize,
}

impl Completion {
    pub fn new(text: impl Into<String>, used_tokens: usize) -> Self {
        Self {
            text: text.into(),
            used_tokens,
        }
    }
}

/// Proposes where the current page should end.
///
/// The passage carries `<k>` tags at candidate boundaries; the response is
/// expected to name one of them.
#[async_trait]
pub trait BoundaryOracle: Send + Sync {
    async fn propose_boundary(
        &self,
        preceding: &str,
        passage: &str,
        end_tag: &str,
    ) -> Result<String, CapabilityError>;
}

/// Compresses one page into a gist.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn shorten(&self, page_text: &str) -> Result<String, CapabilityError>;
}

/// Chooses which pages to re-read for a question.
///
/// The response is expected to contain a bracketed page list like `[2, 7]`.
#[async_trait]
pub trait PageSelector: Send + Sync {
    async fn select_pages(
        &self,
        shortened_article: &str,
        question: &str,
        max_lookup_pages: usize,
    ) -> Result<Completion, CapabilityError>;
}

/// Answers a question from an expanded article.
#[async_trait]
pub trait Answerer: Send + Sync {
    async fn answer(
        &self,
        context: &str,
        question: &str,
        options: Option<&[String]>,
    ) -> Result<Completion, CapabilityError>;
}
