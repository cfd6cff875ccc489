//! Prompt token counting.

use std::sync::Arc;

use tiktoken_rs::CoreBPE;
use tracing::warn;

/// Token counter for prompts sent to token-tracked capabilities.
///
/// Uses tiktoken's cl100k_base encoding, falling back to a
/// ~4 chars per token estimate if the encoding cannot be loaded.
#[derive(Clone)]
pub struct TokenCounter {
    bpe: Option<Arc<CoreBPE>>,
}

impl TokenCounter {
    pub fn new() -> Self {
        let bpe = match tiktoken_rs::cl100k_base() {
            Ok(bpe) => Some(Arc::new(bpe)),
            Err(e) => {
                warn!(error = %e, "cl100k_base unavailable, estimating token counts");
                None
            }
        };
        Self { bpe }
    }

    /// Estimate-only counter.
    pub fn estimating() -> Self {
        Self { bpe: None }
    }

    pub fn count(&self, text: &str) -> usize {
        match &self.bpe {
            Some(bpe) => bpe.encode_with_special_tokens(text).len(),
            None => (text.len() / 4).max(1),
        }
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}
