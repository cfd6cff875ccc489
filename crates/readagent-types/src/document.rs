//! Source documents.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A document to be paged, gisted and queried.
///
/// Immutable once created. The id is either supplied by the dataset or
/// derived from the content hash, so the same text always maps to the same
/// snapshot files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier
    pub doc_id: String,

    /// Raw document text
    pub text: String,
}

impl Document {
    /// Create a document whose id is the SHA-256 hex digest of its text.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let doc_id = content_hash(&text);
        Self { doc_id, text }
    }

    /// Create a document with an externally assigned id.
    pub fn with_id(doc_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            text: text.into(),
        }
    }
}

/// SHA-256 hex digest of the given text.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
