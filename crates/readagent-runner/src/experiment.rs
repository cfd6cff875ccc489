//! Per-document paginate and answer jobs.
//!
//! - paginate: segment, build pages, save pages, compress, save gists
//! - answer: load both snapshots, answer every question, log each outcome

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use readagent_pager::{AgentError, Capabilities, ReadAgent, StoreError};
use readagent_types::{AnswerRecord, Document, ErrorRecord, PaginationConfig, Question};

use crate::output::{AppendLog, OutputError};

/// Error type for a document job.
#[derive(Debug, thiserror::Error)]
pub enum ExperimentError {
    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("Document id {0:?} cannot be used as a file name")]
    InvalidDocId(String),
}

/// Snapshot file of a document inside `dir`.
///
/// Ids that would resolve outside `dir` are rejected.
pub fn snapshot_path(dir: &Path, doc_id: &str) -> Result<PathBuf, ExperimentError> {
    let unsafe_name = doc_id.is_empty()
        || doc_id == "."
        || doc_id == ".."
        || doc_id.contains(['/', '\\', '\0']);
    if unsafe_name {
        return Err(ExperimentError::InvalidDocId(doc_id.to_string()));
    }
    Ok(dir.join(format!("{}.json", doc_id)))
}

/// Counts from one paginated document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginateOutcome {
    pub words: usize,
    pub pages: usize,
}

/// Builds and persists pages and gists for documents.
#[derive(Clone)]
pub struct PaginateJob {
    pub capabilities: Capabilities,
    pub pagination: PaginationConfig,
    pub pages_dir: PathBuf,
    pub gists_dir: PathBuf,
}

impl PaginateJob {
    pub async fn run(&self, document: &Document) -> Result<PaginateOutcome, ExperimentError> {
        let doc_id = document.doc_id.as_str();
        let pages_path = snapshot_path(&self.pages_dir, doc_id)?;
        let gists_path = snapshot_path(&self.gists_dir, doc_id)?;
        let mut agent = ReadAgent::new(self.capabilities.clone(), self.pagination.clone());

        info!(doc_id, "Paginating document");
        let pages = agent.create_pages(&document.text).await?;
        let outcome = PaginateOutcome {
            words: pages.iter().map(|p| p.word_count()).sum(),
            pages: pages.len(),
        };
        agent.save_pages(&pages_path)?;

        info!(doc_id, pages = outcome.pages, "Gisting document");
        agent.shorten_pages().await?;
        agent.save_gists(&gists_path)?;

        info!(doc_id, pages = outcome.pages, "Document paginated");
        Ok(outcome)
    }
}

/// Counts from one answered document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub answered: usize,
    pub failed: usize,
}

/// Answers a document's questions from its snapshots.
#[derive(Clone)]
pub struct AnswerJob {
    pub capabilities: Capabilities,
    pub pagination: PaginationConfig,
    pub max_lookup_pages: usize,
    pub pages_dir: PathBuf,
    pub gists_dir: PathBuf,
    pub answers: Arc<AppendLog>,
    pub errors: Arc<AppendLog>,
}

impl AnswerJob {
    /// Answer every question in order.
    ///
    /// Each question produces exactly one answer or error record. A failed
    /// question does not stop the document; a missing or inconsistent
    /// snapshot does, after logging a document-level error record.
    pub async fn run(
        &self,
        doc_id: &str,
        questions: &[Question],
    ) -> Result<AnswerOutcome, ExperimentError> {
        let agent = match self.load_agent(doc_id) {
            Ok(agent) => agent,
            Err(e) => {
                self.errors.append(&ErrorRecord::for_document(doc_id, &e))?;
                return Err(e);
            }
        };

        let mut outcome = AnswerOutcome::default();
        for question in questions {
            let result = agent
                .answer_question(
                    &question.question,
                    question.options.as_deref(),
                    self.max_lookup_pages,
                )
                .await;

            match result {
                Ok(answer) => {
                    let record = AnswerRecord::new(
                        doc_id,
                        question,
                        &answer.answer,
                        answer.selected_pages,
                        answer.used_tokens,
                    );
                    self.answers.append(&record)?;
                    outcome.answered += 1;
                }
                Err(e) => {
                    warn!(
                        doc_id,
                        question_id = %question.question_id,
                        error = %e,
                        "Question failed"
                    );
                    self.errors
                        .append(&ErrorRecord::for_question(doc_id, &question.question_id, &e))?;
                    outcome.failed += 1;
                }
            }
        }

        info!(
            doc_id,
            answered = outcome.answered,
            failed = outcome.failed,
            "Document answered"
        );
        Ok(outcome)
    }

    fn load_agent(&self, doc_id: &str) -> Result<ReadAgent, ExperimentError> {
        let mut agent = ReadAgent::new(self.capabilities.clone(), self.pagination.clone());
        agent.load_pages(&snapshot_path(&self.pages_dir, doc_id)?)?;
        agent.load_gists(&snapshot_path(&self.gists_dir, doc_id)?)?;
        agent.store().ensure_coverage()?;
        Ok(agent)
    }
}
