//! End-to-end test infrastructure for readagent.
//!
//! Provides a shared TestHarness and helper functions for E2E tests
//! covering the dataset -> pages -> gists -> answers -> report pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;

use readagent_llm::MockBackend;
use readagent_pager::Capabilities;
use readagent_runner::{error_log_path, AnswerJob, AppendLog, PaginateJob};
use readagent_types::PaginationConfig;

/// Shared test harness for E2E tests.
///
/// Lays out a temp artifacts tree mirroring what the runner writes.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    pub dataset_path: PathBuf,
    pub pages_dir: PathBuf,
    pub gists_dir: PathBuf,
    pub answers_dir: PathBuf,
    pub answers_path: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        let answers_dir = root.join("answers");

        Self {
            dataset_path: root.join("dataset.json"),
            pages_dir: root.join("pages"),
            gists_dir: root.join("gists"),
            answers_path: answers_dir.join("run.jsonl"),
            answers_dir,
            _temp_dir: temp_dir,
        }
    }

    pub fn errors_path(&self) -> PathBuf {
        error_log_path(&self.answers_path)
    }

    /// Write a dataset file and return its path.
    pub fn write_dataset(&self, dataset: &serde_json::Value) -> PathBuf {
        let body = serde_json::to_string_pretty(dataset).expect("Failed to encode dataset");
        std::fs::write(&self.dataset_path, body).expect("Failed to write dataset");
        self.dataset_path.clone()
    }

    pub fn paginate_job(&self, backend: Arc<MockBackend>) -> PaginateJob {
        PaginateJob {
            capabilities: Capabilities::from_backend(backend),
            pagination: PaginationConfig::default(),
            pages_dir: self.pages_dir.clone(),
            gists_dir: self.gists_dir.clone(),
        }
    }

    pub fn answer_job(&self, backend: Arc<MockBackend>) -> AnswerJob {
        AnswerJob {
            capabilities: Capabilities::from_backend(backend),
            pagination: PaginationConfig::default(),
            max_lookup_pages: 6,
            pages_dir: self.pages_dir.clone(),
            gists_dir: self.gists_dir.clone(),
            answers: Arc::new(AppendLog::open(&self.answers_path).expect("Failed to open answer log")),
            errors: Arc::new(AppendLog::open(self.errors_path()).expect("Failed to open error log")),
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// An article of `sentences` sentences with `words` words each.
///
/// Every sentence is distinct and ends with a period, so segmentation
/// returns exactly `sentences` units.
pub fn long_article(topic: &str, sentences: usize, words: usize) -> String {
    (0..sentences)
        .map(|s| {
            let body: Vec<String> = (1..words).map(|w| format!("{}{}x{}", topic, s, w)).collect();
            format!("{} end.", body.join(" "))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Two multiple-choice documents and one generative document.
pub fn sample_dataset() -> serde_json::Value {
    json!({
        "harbor": {
            "article": long_article("harbor", 60, 20),
            "questions": [
                {
                    "question_id": "harbor-1",
                    "question": "Where does the story start?",
                    "options": ["At the harbor", "In the city", "On a ship", "Nowhere"],
                    "gold_choice": 1,
                    "hard": true
                },
                {
                    "question_id": "harbor-2",
                    "question": "Who narrates?",
                    "options": ["A sailor", "A merchant"],
                    "gold_choice": 2
                }
            ]
        },
        "orchard": {
            "article": long_article("orchard", 45, 16),
            "questions": [
                {
                    "question_id": "orchard-1",
                    "question": "What grows there?",
                    "options": ["Apples", "Pears"],
                    "gold_choice": 1
                }
            ]
        },
        "lighthouse": {
            "article": long_article("lighthouse", 30, 18),
            "questions": [
                {
                    "question_id": "lighthouse-1",
                    "question": "What is the keeper called?",
                    "gold_answers": ["lighthouse0x1 lighthouse0x2"]
                }
            ]
        }
    })
}
