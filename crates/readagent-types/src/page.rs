//! Sentences, pages and gists.
//!
//! A page is a contiguous, non-empty run of sentences. Pages partition a
//! document's sentence sequence and are identified by their 0-based
//! position. A gist is the compressed text of exactly one page.

use serde::{Deserialize, Serialize};

/// Compressed text of exactly one page, aligned by position with the pages.
pub type Gist = String;

/// Whitespace word count.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// A sentence-like unit produced by the segmenter.
///
/// Serialized as its bare text so page snapshots stay a plain
/// list of lists of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Sentence {
    text: String,
    word_count: usize,
}

impl Sentence {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let word_count = count_words(&text);
        Self { text, word_count }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }
}

impl From<String> for Sentence {
    fn from(text: String) -> Self {
        Sentence::new(text)
    }
}

impl From<&str> for Sentence {
    fn from(text: &str) -> Self {
        Sentence::new(text)
    }
}

impl From<Sentence> for String {
    fn from(sentence: Sentence) -> Self {
        sentence.text
    }
}

/// An ordered run of sentences treated as one retrievable unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Page {
    sentences: Vec<Sentence>,
}

impl Page {
    /// Create a page from its sentences.
    pub fn new(sentences: Vec<Sentence>) -> Self {
        Self { sentences }
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// Full page text, one sentence per line.
    pub fn text(&self) -> String {
        self.sentences
            .iter()
            .map(Sentence::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn word_count(&self) -> usize {
        self.sentences.iter().map(Sentence::word_count).sum()
    }
}

impl From<Vec<String>> for Page {
    fn from(sentences: Vec<String>) -> Self {
        Page::new(sentences.into_iter().map(Sentence::from).collect())
    }
}
