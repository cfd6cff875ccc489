//! Lookup-driven memory expansion and answering.
//!
//! Per question the gists are shown to a page selector, the selected pages
//! are swapped back to full text, and the answerer sees that hybrid view.

use std::sync::Arc;

use tracing::{debug, info, warn};

use readagent_llm::{Answerer, CapabilityError, PageSelector};
use readagent_types::{multiple_choice_text_unnumbered, Gist};

use crate::store::{MemoryStore, StoreError};

/// Error type for lookup and answering.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Page selection failed: {0}")]
    Selection(#[source] CapabilityError),

    #[error("Answering failed: {0}")]
    Answer(#[source] CapabilityError),
}

/// Result of answering one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupAnswer {
    pub answer: String,
    pub selected_pages: Vec<usize>,
    /// Selector plus answerer input tokens
    pub used_tokens: usize,
}

pub struct LookupEngine {
    selector: Arc<dyn PageSelector>,
    answerer: Arc<dyn Answerer>,
}

impl LookupEngine {
    pub fn new(selector: Arc<dyn PageSelector>, answerer: Arc<dyn Answerer>) -> Self {
        Self { selector, answerer }
    }

    /// Answer `question` against `store`.
    ///
    /// Gist coverage is checked before any capability is called. The
    /// selector sees options as plain bullets; the answerer gets the
    /// original question and options.
    pub async fn answer(
        &self,
        store: &MemoryStore,
        question: &str,
        options: Option<&[String]>,
        max_lookup_pages: usize,
    ) -> Result<LookupAnswer, LookupError> {
        store.ensure_coverage()?;

        let shortened_article = build_shortened_article(store.gists());
        let lookup_question = match options {
            Some(options) if !options.is_empty() => {
                multiple_choice_text_unnumbered(question, options)
            }
            _ => question.to_string(),
        };

        let selection = self
            .selector
            .select_pages(&shortened_article, &lookup_question, max_lookup_pages)
            .await
            .map_err(LookupError::Selection)?;
        debug!(response = %selection.text, "Page selector responded");

        let selected_pages = parse_page_selection(&selection.text, store.page_count());
        info!(pages = ?selected_pages, "Looking up pages");

        let context = expand_view(store, &selected_pages);
        let completion = self
            .answerer
            .answer(&context, question, options)
            .await
            .map_err(LookupError::Answer)?;

        Ok(LookupAnswer {
            answer: completion.text,
            selected_pages,
            used_tokens: selection.used_tokens + completion.used_tokens,
        })
    }
}

/// Gists labelled `<Page i>`, one block per page.
pub fn build_shortened_article(gists: &[Gist]) -> String {
    gists
        .iter()
        .enumerate()
        .map(|(index, gist)| format!("<Page {}>\n{}", index, gist))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Page indices named in the first `[...]` of a selector response.
///
/// Only the first `[` and the first `]` are considered; if either is
/// missing or they are out of order the selection is empty. Non-numeric
/// entries are dropped silently, out-of-range ones with a warning, and
/// repeats keep their first position.
pub fn parse_page_selection(response: &str, num_pages: usize) -> Vec<usize> {
    let (Some(open), Some(close)) = (response.find('['), response.find(']')) else {
        return Vec::new();
    };
    if close < open {
        return Vec::new();
    }

    let mut selected = Vec::new();
    for token in response[open + 1..close].split(',').map(str::trim) {
        if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        let Ok(index) = token.parse::<usize>() else {
            continue;
        };
        if index >= num_pages {
            warn!(index, num_pages, "Ignoring selected page outside document");
            continue;
        }
        if !selected.contains(&index) {
            selected.push(index);
        }
    }
    selected
}

/// Gists with the selected entries replaced by their full page text.
pub fn expand_view(store: &MemoryStore, selected: &[usize]) -> String {
    store
        .gists()
        .iter()
        .enumerate()
        .map(|(index, gist)| match store.pages().get(index) {
            Some(page) if selected.contains(&index) => page.text(),
            _ => gist.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
