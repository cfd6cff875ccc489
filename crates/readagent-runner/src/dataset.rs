//! Preprocessed dataset loading.
//!
//! A dataset is one JSON object keyed by document id:
//!
//! ```json
//! {
//!   "doc-1": {
//!     "article": "Full text ...",
//!     "questions": [
//!       {"question_id": "q1", "question": "Who ...?", "options": ["A", "B"], "gold_choice": 2}
//!     ]
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use readagent_types::{Document, Question};

/// Error type for dataset loading.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Failed to read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse dataset {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One document and its questions as stored in the dataset file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub article: String,

    #[serde(default)]
    pub questions: Vec<Question>,
}

/// A document ready for processing.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetItem {
    pub document: Document,
    pub questions: Vec<Question>,
}

/// Dataset keyed by document id, iterated in id order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    entries: BTreeMap<String, DatasetEntry>,
}

impl Dataset {
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let contents = fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dataset: Dataset =
            serde_json::from_str(&contents).map_err(|source| DatasetError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        info!(
            path = %path.display(),
            documents = dataset.len(),
            questions = dataset.question_count(),
            "Loaded dataset"
        );
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn question_count(&self) -> usize {
        self.entries.values().map(|e| e.questions.len()).sum()
    }

    /// Documents with their questions. A blank key falls back to the
    /// content hash of the article.
    pub fn items(&self) -> Vec<DatasetItem> {
        self.entries
            .iter()
            .map(|(doc_id, entry)| {
                let document = if doc_id.trim().is_empty() {
                    Document::new(entry.article.clone())
                } else {
                    Document::with_id(doc_id.clone(), entry.article.clone())
                };
                DatasetItem {
                    document,
                    questions: entry.questions.clone(),
                }
            })
            .collect()
    }
}
