//! Mock backend for testing and offline dry runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::capability::{Answerer, BoundaryOracle, Completion, PageSelector, Summarizer};
use crate::error::CapabilityError;
use crate::tokens::TokenCounter;

/// Deterministic implementation of every capability.
///
/// - boundary: names the first `<k>` tag in the passage
/// - gist: the first few words of the page
/// - lookup: a fixed response (default `Page [0]`)
/// - answer: a fixed response (default `[[1]]` for multiple choice)
///
/// Call counters and the last answering context are recorded for assertions.
pub struct MockBackend {
    gist_words: usize,
    boundary_response: Option<String>,
    selection_response: String,
    answer_response: Option<String>,
    fail_gists_containing: Option<String>,
    fail_answers_containing: Option<String>,
    tokens: TokenCounter,

    oracle_calls: AtomicUsize,
    summarizer_calls: AtomicUsize,
    selector_calls: AtomicUsize,
    answerer_calls: AtomicUsize,
    last_context: Mutex<Option<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            gist_words: 8,
            boundary_response: None,
            selection_response: "I want to look up Page [0] to check.".to_string(),
            answer_response: None,
            fail_gists_containing: None,
            fail_answers_containing: None,
            tokens: TokenCounter::estimating(),
            oracle_calls: AtomicUsize::new(0),
            summarizer_calls: AtomicUsize::new(0),
            selector_calls: AtomicUsize::new(0),
            answerer_calls: AtomicUsize::new(0),
            last_context: Mutex::new(None),
        }
    }

    /// Always answer the boundary oracle with this text.
    pub fn with_boundary_response(mut self, response: impl Into<String>) -> Self {
        self.boundary_response = Some(response.into());
        self
    }

    /// Answer the page selector with this text.
    pub fn with_selection_response(mut self, response: impl Into<String>) -> Self {
        self.selection_response = response.into();
        self
    }

    /// Answer every question with this text.
    pub fn with_answer_response(mut self, response: impl Into<String>) -> Self {
        self.answer_response = Some(response.into());
        self
    }

    /// Number of leading words kept in a gist.
    pub fn with_gist_words(mut self, words: usize) -> Self {
        self.gist_words = words.max(1);
        self
    }

    /// Fail gisting for pages containing `needle`.
    pub fn failing_gists_containing(mut self, needle: impl Into<String>) -> Self {
        self.fail_gists_containing = Some(needle.into());
        self
    }

    /// Fail answering for questions containing `needle`.
    pub fn failing_answers_containing(mut self, needle: impl Into<String>) -> Self {
        self.fail_answers_containing = Some(needle.into());
        self
    }

    pub fn oracle_calls(&self) -> usize {
        self.oracle_calls.load(Ordering::SeqCst)
    }

    pub fn summarizer_calls(&self) -> usize {
        self.summarizer_calls.load(Ordering::SeqCst)
    }

    pub fn selector_calls(&self) -> usize {
        self.selector_calls.load(Ordering::SeqCst)
    }

    pub fn answerer_calls(&self) -> usize {
        self.answerer_calls.load(Ordering::SeqCst)
    }

    /// Context passed to the most recent answer call.
    pub fn last_context(&self) -> Option<String> {
        self.last_context
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// First `<digits>` tag in the passage.
fn first_tag(passage: &str) -> Option<&str> {
    passage.match_indices('<').find_map(|(start, _)| {
        let rest = &passage[start + 1..];
        let end = rest.find('>')?;
        let inner = &rest[..end];
        (!inner.is_empty() && inner.bytes().all(|b| b.is_ascii_digit()))
            .then(|| &passage[start..start + end + 2])
    })
}

#[async_trait]
impl BoundaryOracle for MockBackend {
    async fn propose_boundary(
        &self,
        _preceding: &str,
        passage: &str,
        _end_tag: &str,
    ) -> Result<String, CapabilityError> {
        self.oracle_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(response) = &self.boundary_response {
            return Ok(response.clone());
        }
        Ok(match first_tag(passage) {
            Some(tag) => format!("Label: {}\nBecause the scene changes there.", tag),
            None => "No natural transition found.".to_string(),
        })
    }
}

#[async_trait]
impl Summarizer for MockBackend {
    async fn shorten(&self, page_text: &str) -> Result<String, CapabilityError> {
        self.summarizer_calls.fetch_add(1, Ordering::SeqCst);

        if page_text.trim().is_empty() {
            return Err(CapabilityError::EmptyInput);
        }
        if let Some(needle) = &self.fail_gists_containing {
            if page_text.contains(needle.as_str()) {
                return Err(CapabilityError::Transport("injected gisting failure".into()));
            }
        }

        let words: Vec<&str> = page_text.split_whitespace().take(self.gist_words).collect();
        Ok(format!("{} ...", words.join(" ")))
    }
}

#[async_trait]
impl PageSelector for MockBackend {
    async fn select_pages(
        &self,
        shortened_article: &str,
        question: &str,
        _max_lookup_pages: usize,
    ) -> Result<Completion, CapabilityError> {
        self.selector_calls.fetch_add(1, Ordering::SeqCst);

        let used_tokens = self.tokens.count(shortened_article) + self.tokens.count(question);
        Ok(Completion::new(self.selection_response.clone(), used_tokens))
    }
}

#[async_trait]
impl Answerer for MockBackend {
    async fn answer(
        &self,
        context: &str,
        question: &str,
        options: Option<&[String]>,
    ) -> Result<Completion, CapabilityError> {
        self.answerer_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(needle) = &self.fail_answers_containing {
            if question.contains(needle.as_str()) {
                return Err(CapabilityError::RateLimitExceeded);
            }
        }
        if let Ok(mut last) = self.last_context.lock() {
            *last = Some(context.to_string());
        }

        let used_tokens = self.tokens.count(context) + self.tokens.count(question);
        let text = match (&self.answer_response, options) {
            (Some(response), _) => response.clone(),
            (None, Some(options)) if !options.is_empty() => {
                "Option one is best supported by the context. [[1]]".to_string()
            }
            (None, _) => context.split_whitespace().take(5).collect::<Vec<_>>().join(" "),
        };
        Ok(Completion::new(text, used_tokens))
    }
}
