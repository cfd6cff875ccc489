//! `ReadAgent`: the per-document pipeline facade.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use readagent_llm::{Answerer, BoundaryOracle, PageSelector, Summarizer};
use readagent_types::{Gist, Page, PaginationConfig};

use crate::gisting::{GistingError, PageCompressor};
use crate::lookup::{LookupAnswer, LookupEngine, LookupError};
use crate::pagination::{PageBuilder, PaginationError};
use crate::segmenter::segment;
use crate::store::{MemoryStore, SnapshotError};

/// Error type for the agent facade.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Pagination(#[from] PaginationError),

    #[error(transparent)]
    Gisting(#[from] GistingError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// The four capabilities the pipeline calls out to.
#[derive(Clone)]
pub struct Capabilities {
    pub oracle: Arc<dyn BoundaryOracle>,
    pub summarizer: Arc<dyn Summarizer>,
    pub selector: Arc<dyn PageSelector>,
    pub answerer: Arc<dyn Answerer>,
}

impl Capabilities {
    /// Use one backend for every capability.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: BoundaryOracle + Summarizer + PageSelector + Answerer + 'static,
    {
        Self {
            oracle: backend.clone(),
            summarizer: backend.clone(),
            selector: backend.clone(),
            answerer: backend,
        }
    }
}

/// Reads one document into episodic memory and answers questions from it.
///
/// Each agent owns its [`MemoryStore`]; run one agent per document.
pub struct ReadAgent {
    capabilities: Capabilities,
    config: PaginationConfig,
    max_sentence_words: usize,
    store: MemoryStore,
}

impl ReadAgent {
    /// Sentences are bounded by `config.word_limit` words.
    pub fn new(capabilities: Capabilities, config: PaginationConfig) -> Self {
        let max_sentence_words = config.word_limit;
        Self {
            capabilities,
            config,
            max_sentence_words,
            store: MemoryStore::new(),
        }
    }

    pub fn with_max_sentence_words(mut self, max_sentence_words: usize) -> Self {
        self.max_sentence_words = max_sentence_words.max(1);
        self
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Segment `text` and partition it into pages, replacing any previous
    /// pages and gists.
    pub async fn create_pages(&mut self, text: &str) -> Result<&[Page], AgentError> {
        let sentences = segment(text, self.max_sentence_words);
        let builder = PageBuilder::new(self.capabilities.oracle.clone(), self.config.clone());
        let pages = builder.build_pages(&sentences).await?;

        self.store.set_pages(pages);
        Ok(self.store.pages())
    }

    /// Compress every page into a gist.
    pub async fn shorten_pages(&mut self) -> Result<&[Gist], AgentError> {
        let compressor = PageCompressor::new(self.capabilities.summarizer.clone());
        let gists = compressor.shorten_pages(self.store.pages()).await?;

        self.store.set_gists(gists);
        Ok(self.store.gists())
    }

    pub fn save_pages(&self, path: &Path) -> Result<(), AgentError> {
        Ok(self.store.save_pages(path)?)
    }

    pub fn load_pages(&mut self, path: &Path) -> Result<(), AgentError> {
        Ok(self.store.load_pages(path)?)
    }

    pub fn save_gists(&self, path: &Path) -> Result<(), AgentError> {
        Ok(self.store.save_gists(path)?)
    }

    pub fn load_gists(&mut self, path: &Path) -> Result<(), AgentError> {
        Ok(self.store.load_gists(path)?)
    }

    /// Answer a question from the current memory.
    pub async fn answer_question(
        &self,
        question: &str,
        options: Option<&[String]>,
        max_lookup_pages: usize,
    ) -> Result<LookupAnswer, AgentError> {
        let engine = LookupEngine::new(
            self.capabilities.selector.clone(),
            self.capabilities.answerer.clone(),
        );
        let answer = engine
            .answer(&self.store, question, options, max_lookup_pages)
            .await?;

        info!(
            pages = ?answer.selected_pages,
            used_tokens = answer.used_tokens,
            "Answered question"
        );
        Ok(answer)
    }
}
