//! Bounded per-document worker pool.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use readagent_types::BatchPolicy;

/// Error type for batch runs.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("Document {doc_id} failed: {message}")]
    DocumentFailed { doc_id: String, message: String },

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Outcome counts of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Run `job` once per item with at most `max_workers` running at a time.
///
/// Items are `(doc_id, input)` pairs. Under [`BatchPolicy::FailFast`] the
/// first failure aborts the remaining tasks and is returned; under
/// [`BatchPolicy::Isolate`] failures are counted and the batch continues.
pub async fn run_batch<I, F, Fut, E>(
    items: Vec<(String, I)>,
    max_workers: usize,
    policy: BatchPolicy,
    job: F,
) -> Result<BatchSummary, BatchError>
where
    I: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let total = items.len();
    let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
    let job = Arc::new(job);
    let mut tasks = JoinSet::new();

    for (doc_id, item) in items {
        let semaphore = Arc::clone(&semaphore);
        let job = Arc::clone(&job);
        tasks.spawn(async move {
            let result = match semaphore.acquire_owned().await {
                Ok(_permit) => job(item).await.map_err(|e| e.to_string()),
                Err(_) => Err("worker pool closed".to_string()),
            };
            (doc_id, result)
        });
    }

    let mut summary = BatchSummary::default();
    while let Some(joined) = tasks.join_next().await {
        let (doc_id, result) = match joined {
            Ok(outcome) => outcome,
            Err(e) if policy == BatchPolicy::Isolate => {
                error!(error = %e, "Worker task failed");
                summary.failed += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        match result {
            Ok(()) => summary.succeeded += 1,
            Err(message) => {
                error!(doc_id = %doc_id, error = %message, "Document failed");
                summary.failed += 1;
                if policy == BatchPolicy::FailFast {
                    tasks.abort_all();
                    return Err(BatchError::DocumentFailed { doc_id, message });
                }
            }
        }
    }

    info!(
        documents = total,
        succeeded = summary.succeeded,
        failed = summary.failed,
        "Batch finished"
    );
    Ok(summary)
}
