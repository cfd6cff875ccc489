//! Page compression into gists.

use std::sync::Arc;

use tracing::{debug, info};

use readagent_llm::{CapabilityError, Summarizer};
use readagent_types::{Gist, Page};

/// Error type for gisting.
#[derive(Debug, thiserror::Error)]
pub enum GistingError {
    #[error("No pages to shorten")]
    NoPages,

    #[error("Summarizer failed on page {page}: {source}")]
    Capability {
        page: usize,
        #[source]
        source: CapabilityError,
    },
}

/// Produces one gist per page with a summarizer.
pub struct PageCompressor {
    summarizer: Arc<dyn Summarizer>,
}

impl PageCompressor {
    pub fn new(summarizer: Arc<dyn Summarizer>) -> Self {
        Self { summarizer }
    }

    /// Shorten every page, in page order.
    ///
    /// Calls are sequential. Any failure fails the whole batch and no
    /// partial gist list is returned.
    pub async fn shorten_pages(&self, pages: &[Page]) -> Result<Vec<Gist>, GistingError> {
        if pages.is_empty() {
            return Err(GistingError::NoPages);
        }

        let mut gists = Vec::with_capacity(pages.len());
        for (index, page) in pages.iter().enumerate() {
            let gist = self
                .summarizer
                .shorten(&page.text())
                .await
                .map_err(|source| GistingError::Capability {
                    page: index,
                    source,
                })?;
            let gist = gist.trim().to_string();
            debug!(
                page = index,
                page_words = page.word_count(),
                gist_words = readagent_types::count_words(&gist),
                "Shortened page"
            );
            gists.push(gist);
        }

        info!(gists = gists.len(), "Gisting done");
        Ok(gists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use readagent_llm::MockBackend;
    use readagent_types::Sentence;

    fn page(lines: &[&str]) -> Page {
        Page::new(lines.iter().map(|l| Sentence::new(*l)).collect())
    }

    #[tokio::test]
    async fn test_one_gist_per_page_in_order() {
        let mock = Arc::new(MockBackend::new().with_gist_words(2));
        let compressor = PageCompressor::new(mock.clone());
        let pages = vec![
            page(&["Alpha beta gamma.", "Delta."]),
            page(&["Epsilon zeta eta."]),
            page(&["Theta iota."]),
        ];

        let gists = compressor.shorten_pages(&pages).await.unwrap();

        assert_eq!(
            gists,
            vec!["Alpha beta ...", "Epsilon zeta ...", "Theta iota. ..."]
        );
        assert_eq!(mock.summarizer_calls(), 3);
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected() {
        let mock = Arc::new(MockBackend::new());
        let result = PageCompressor::new(mock.clone()).shorten_pages(&[]).await;
        assert!(matches!(result, Err(GistingError::NoPages)));
        assert_eq!(mock.summarizer_calls(), 0);
    }

    #[tokio::test]
    async fn test_failure_fails_whole_batch() {
        let mock = Arc::new(MockBackend::new().failing_gists_containing("poison"));
        let compressor = PageCompressor::new(mock.clone());
        let pages = vec![
            page(&["A fine page."]),
            page(&["A poison page."]),
            page(&["Never reached."]),
        ];

        let result = compressor.shorten_pages(&pages).await;

        match result {
            Err(GistingError::Capability { page, .. }) => assert_eq!(page, 1),
            other => panic!("expected capability error, got {other:?}"),
        }
        assert_eq!(mock.summarizer_calls(), 2);
    }
}
