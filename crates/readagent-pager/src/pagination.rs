//! Page building.
//!
//! Sentences are partitioned into contiguous pages. For each page a
//! candidate window is grown from the cursor until it holds `word_limit`
//! words; once the running count passes `start_threshold`, sentence
//! boundaries inside the window are tagged `<k>` and the boundary oracle
//! is asked to pick one. A tag `<k>` means "end the page before sentence k".

use std::sync::Arc;

use tracing::{debug, info, warn};

use readagent_llm::{BoundaryOracle, CapabilityError};
use readagent_types::{Page, PaginationConfig, Sentence};

/// Error type for page building.
#[derive(Debug, thiserror::Error)]
pub enum PaginationError {
    #[error("No valid pause point for sentences {start}..{end} (oracle said: {response:?})")]
    NoBoundary {
        start: usize,
        end: usize,
        response: String,
    },

    #[error("Boundary oracle failed: {0}")]
    Capability(#[from] CapabilityError),
}

/// Candidate window `[start, end)` prepared for the oracle.
struct Window {
    end: usize,
    word_count: usize,
    passage: String,
    tags: Vec<usize>,
}

/// Builds pages from a sentence sequence with a boundary oracle.
pub struct PageBuilder {
    oracle: Arc<dyn BoundaryOracle>,
    config: PaginationConfig,
}

impl PageBuilder {
    pub fn new(oracle: Arc<dyn BoundaryOracle>, config: PaginationConfig) -> Self {
        Self { oracle, config }
    }

    /// Partition `sentences` into pages.
    ///
    /// Pages are contiguous and non-overlapping, and their concatenation is
    /// exactly `sentences`. With a deterministic oracle the result is
    /// deterministic. Zero sentences yield zero pages.
    pub async fn build_pages(&self, sentences: &[Sentence]) -> Result<Vec<Page>, PaginationError> {
        let total = sentences.len();
        let mut pages: Vec<Page> = Vec::new();
        let mut start = 0;

        while start < total {
            let preceding = match pages.last() {
                Some(previous) => format!("...\n{}", previous.text()),
                None => String::new(),
            };
            let window = self.grow_window(sentences, start);

            let pause_point = if window.word_count < self.config.min_words_to_start_pagination {
                // Too little text left to be worth asking; close the document.
                total
            } else {
                let end_tag = if window.end == total {
                    String::new()
                } else {
                    format!("{}\n...", sentences[window.end].text())
                };

                let response = self
                    .oracle
                    .propose_boundary(&preceding, &window.passage, &end_tag)
                    .await?;

                match accept_pause_point(&response, start, &window) {
                    Some(point) => point,
                    None if self.config.allow_fallback_to_last => {
                        warn!(
                            start,
                            end = window.end,
                            response = %response,
                            "No valid pause point, falling back to window end"
                        );
                        window.end
                    }
                    None => {
                        return Err(PaginationError::NoBoundary {
                            start,
                            end: window.end,
                            response,
                        })
                    }
                }
            };

            let page = Page::new(sentences[start..pause_point].to_vec());
            debug!(
                page = pages.len(),
                first_sentence = start,
                last_sentence = pause_point - 1,
                words = page.word_count(),
                "Built page"
            );
            pages.push(page);
            start = pause_point;
        }

        info!(pages = pages.len(), sentences = total, "Pagination done");
        Ok(pages)
    }

    /// Grow the candidate window starting at `start`.
    fn grow_window(&self, sentences: &[Sentence], start: usize) -> Window {
        let mut lines = vec![sentences[start].text().to_string()];
        let mut tags = Vec::new();
        let mut word_count = sentences[start].word_count();
        let mut end = start + 1;

        while word_count < self.config.word_limit && end < sentences.len() {
            word_count += sentences[end].word_count();
            if word_count >= self.config.start_threshold {
                lines.push(format!("<{}>", end));
                tags.push(end);
            }
            lines.push(sentences[end].text().to_string());
            end += 1;
        }
        lines.push(format!("<{}>", end));
        tags.push(end);

        Window {
            end,
            word_count,
            passage: lines.join("\n"),
            tags,
        }
    }
}

/// Parse and validate the oracle's decision against the current window.
///
/// Accepted only if it names a tag offered in the window, which also
/// guarantees `start < point <= window.end`.
fn accept_pause_point(response: &str, start: usize, window: &Window) -> Option<usize> {
    let point = parse_pause_point(response)?;
    if point <= start || point > window.end || !window.tags.contains(&point) {
        info!(
            start,
            end = window.end,
            pause_point = point,
            "Rejected out-of-range pause point"
        );
        return None;
    }
    Some(point)
}

/// Extract the first `<digits>` label from an oracle response.
pub fn parse_pause_point(response: &str) -> Option<usize> {
    response.match_indices('<').find_map(|(open, _)| {
        let rest = &response[open + 1..];
        let close = rest.find('>')?;
        let label = &rest[..close];
        if label.is_empty() || !label.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        label.parse().ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use readagent_llm::MockBackend;
    use std::sync::Mutex;

    /// `count` sentences of `words` words each, with distinct words.
    fn sentences(count: usize, words: usize) -> Vec<Sentence> {
        (0..count)
            .map(|s| {
                let text = (0..words)
                    .map(|w| format!("s{}w{}", s, w))
                    .collect::<Vec<_>>()
                    .join(" ");
                Sentence::new(text + ".")
            })
            .collect()
    }

    fn builder(oracle: Arc<dyn BoundaryOracle>) -> PageBuilder {
        PageBuilder::new(oracle, PaginationConfig::default())
    }

    fn assert_partition(pages: &[Page], input: &[Sentence]) {
        assert!(pages.iter().all(|p| !p.is_empty()));
        let flattened: Vec<Sentence> = pages
            .iter()
            .flat_map(|p| p.sentences().iter().cloned())
            .collect();
        assert_eq!(flattened, input);
    }

    /// Records the arguments of each oracle call.
    struct RecordingOracle {
        calls: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl BoundaryOracle for RecordingOracle {
        async fn propose_boundary(
            &self,
            preceding: &str,
            passage: &str,
            end_tag: &str,
        ) -> Result<String, CapabilityError> {
            self.calls.lock().unwrap().push((
                preceding.to_string(),
                passage.to_string(),
                end_tag.to_string(),
            ));
            Ok("garbage".to_string())
        }
    }

    #[test]
    fn test_parse_pause_point() {
        assert_eq!(parse_pause_point("Label: <57>\n Because ..."), Some(57));
        assert_eq!(parse_pause_point("<3>"), Some(3));
        assert_eq!(parse_pause_point("Break point: <12>"), Some(12));
        assert_eq!(parse_pause_point("a <b> then <9>"), Some(9));
        assert_eq!(parse_pause_point("no label here"), None);
        assert_eq!(parse_pause_point("<-4>"), None);
        assert_eq!(parse_pause_point("<>"), None);
        assert_eq!(parse_pause_point("<12"), None);
    }

    #[tokio::test]
    async fn test_short_document_skips_oracle() {
        let mock = Arc::new(MockBackend::new());
        let input = sentences(3, 10);

        let pages = builder(mock.clone()).build_pages(&input).await.unwrap();

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].len(), 3);
        assert_eq!(mock.oracle_calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_input_yields_no_pages() {
        let mock = Arc::new(MockBackend::new());
        let pages = builder(mock.clone()).build_pages(&[]).await.unwrap();
        assert!(pages.is_empty());
        assert_eq!(mock.oracle_calls(), 0);
    }

    #[tokio::test]
    async fn test_oracle_pause_points_partition_document() {
        let mock = Arc::new(MockBackend::new());
        let input = sentences(100, 20);

        let pages = builder(mock.clone()).build_pages(&input).await.unwrap();

        // The mock names the first tag, which appears once 14 sentences
        // (280 words) are in the window, so pages hold 13 sentences until
        // the tail drops under the pagination minimum.
        assert_partition(&pages, &input);
        assert_eq!(pages.len(), 8);
        assert!(pages[..7].iter().all(|p| p.len() == 13));
        assert_eq!(pages[7].len(), 9);
        assert_eq!(mock.oracle_calls(), 7);
    }

    #[tokio::test]
    async fn test_rejected_decision_falls_back_to_window_end() {
        // "<0>" equals the cursor on the first page and is below it afterwards.
        let mock = Arc::new(MockBackend::new().with_boundary_response("Label: <0>"));
        let input = sentences(100, 20);

        let pages = builder(mock.clone()).build_pages(&input).await.unwrap();

        assert_partition(&pages, &input);
        let sizes: Vec<usize> = pages.iter().map(Page::len).collect();
        assert_eq!(sizes, vec![30, 30, 30, 10]);
        assert_eq!(mock.oracle_calls(), 3);
    }

    #[tokio::test]
    async fn test_decision_beyond_window_is_rejected() {
        let mock = Arc::new(MockBackend::new().with_boundary_response("<9999>"));
        let input = sentences(100, 20);

        let pages = builder(mock).build_pages(&input).await.unwrap();
        assert_eq!(pages[0].len(), 30);
    }

    #[tokio::test]
    async fn test_untagged_index_is_rejected() {
        // Sentence 5 lies inside the first window but before the tags start.
        let mock = Arc::new(MockBackend::new().with_boundary_response("Label: <5>"));
        let input = sentences(100, 20);

        let pages = builder(mock).build_pages(&input).await.unwrap();
        assert_eq!(pages[0].len(), 30);
    }

    #[tokio::test]
    async fn test_unparsable_without_fallback_is_fatal() {
        let mock = Arc::new(MockBackend::new().with_boundary_response("I cannot decide."));
        let config = PaginationConfig {
            allow_fallback_to_last: false,
            ..Default::default()
        };
        let builder = PageBuilder::new(mock, config);

        let result = builder.build_pages(&sentences(100, 20)).await;
        match result {
            Err(PaginationError::NoBoundary { start, end, response }) => {
                assert_eq!(start, 0);
                assert_eq!(end, 30);
                assert_eq!(response, "I cannot decide.");
            }
            other => panic!("expected NoBoundary, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rebuild_is_idempotent() {
        let mock = Arc::new(MockBackend::new());
        let input = sentences(57, 17);
        let builder = builder(mock);

        let first = builder.build_pages(&input).await.unwrap();
        let second = builder.build_pages(&input).await.unwrap();
        assert_eq!(first, second);
        assert_partition(&first, &input);
    }

    #[tokio::test]
    async fn test_oracle_receives_context_and_tags() {
        let oracle = Arc::new(RecordingOracle {
            calls: Mutex::new(Vec::new()),
        });
        let input = sentences(100, 20);

        builder(oracle.clone()).build_pages(&input).await.unwrap();

        let calls = oracle.calls.lock().unwrap();
        let (preceding, passage, end_tag) = &calls[0];
        assert!(preceding.is_empty());
        assert!(passage.starts_with("s0w0"));
        assert!(!passage.contains("<12>"));
        assert!(passage.contains("\n<13>\ns13w0"));
        assert!(passage.ends_with("\n<30>"));
        assert_eq!(end_tag, &format!("{}\n...", input[30].text()));

        let (preceding, passage, _) = &calls[1];
        assert!(preceding.starts_with("...\ns0w0"));
        assert!(passage.starts_with("s30w0"));
    }

    #[tokio::test]
    async fn test_oracle_failure_propagates() {
        struct Failing;

        #[async_trait]
        impl BoundaryOracle for Failing {
            async fn propose_boundary(
                &self,
                _: &str,
                _: &str,
                _: &str,
            ) -> Result<String, CapabilityError> {
                Err(CapabilityError::Timeout)
            }
        }

        let result = builder(Arc::new(Failing)).build_pages(&sentences(100, 20)).await;
        assert!(matches!(
            result,
            Err(PaginationError::Capability(CapabilityError::Timeout))
        ));
    }
}
