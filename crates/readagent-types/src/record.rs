//! Answer and error log records.
//!
//! Every question either yields an [`AnswerRecord`] in the answer log or an
//! [`ErrorRecord`] in the parallel error log.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::question::Question;

/// One answered question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub document_id: String,
    pub question_id: String,
    pub question: String,

    /// Gold choice for multiple-choice questions (1-based)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gold: Option<u32>,

    /// Reference answers for generative questions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gold_answers: Vec<String>,

    /// Answer text, flattened to a single line
    pub predicted_answer: String,

    /// Choice parsed from a `[[n]]` marker in the answer
    #[serde(default)]
    pub predicted_choice: Option<u32>,

    /// Whether the predicted choice matches the gold choice.
    /// Absent for generative questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_choice: Option<bool>,

    #[serde(default)]
    pub hard: bool,

    pub looked_up_page_ids: Vec<usize>,

    pub used_tokens: usize,
}

impl AnswerRecord {
    /// Build a record from a question and the engine's output.
    ///
    /// A missing `[[n]]` marker yields `predicted_choice: None`, which is
    /// never scored as correct.
    pub fn new(
        document_id: impl Into<String>,
        question: &Question,
        answer: &str,
        looked_up_page_ids: Vec<usize>,
        used_tokens: usize,
    ) -> Self {
        let (predicted_choice, correct_choice) = if question.is_multiple_choice() {
            let predicted = extract_choice(answer);
            let correct = match (predicted, question.gold_choice) {
                (Some(p), Some(g)) => p == g,
                _ => false,
            };
            (predicted, Some(correct))
        } else {
            (None, None)
        };

        Self {
            document_id: document_id.into(),
            question_id: question.question_id.clone(),
            question: question.question.clone(),
            gold: question.gold_choice,
            gold_answers: question.gold_answers.clone(),
            predicted_answer: answer.replace('\n', " "),
            predicted_choice,
            correct_choice,
            hard: question.hard,
            looked_up_page_ids,
            used_tokens,
        }
    }

    pub fn is_correct(&self) -> bool {
        self.correct_choice.unwrap_or(false)
    }
}

/// A question (or whole document) that could not be answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub document_id: String,

    /// Absent when the failure happened before any question was reached
    #[serde(default)]
    pub question_id: Option<String>,

    pub error: String,
}

impl ErrorRecord {
    pub fn for_question(
        document_id: impl Into<String>,
        question_id: impl Into<String>,
        error: impl ToString,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            question_id: Some(question_id.into()),
            error: error.to_string(),
        }
    }

    pub fn for_document(document_id: impl Into<String>, error: impl ToString) -> Self {
        Self {
            document_id: document_id.into(),
            question_id: None,
            error: error.to_string(),
        }
    }
}

fn choice_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"\[\[(\d+)\]\]").expect("valid choice marker regex"))
}

/// Extract the first `[[n]]` choice marker from an answer.
pub fn extract_choice(answer: &str) -> Option<u32> {
    choice_marker()
        .captures(answer)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mc_question(gold: u32) -> Question {
        Question {
            question_id: "q-1".to_string(),
            question: "Which?".to_string(),
            options: Some(vec!["a".into(), "b".into(), "c".into()]),
            gold_choice: Some(gold),
            gold_answers: Vec::new(),
            hard: true,
        }
    }

    #[test]
    fn test_extract_choice_anywhere() {
        assert_eq!(extract_choice("The answer is clearly [[2]] because..."), Some(2));
        assert_eq!(extract_choice("[[3]]"), Some(3));
        assert_eq!(extract_choice("first [[1]] then [[4]]"), Some(1));
    }

    #[test]
    fn test_extract_choice_absent() {
        assert_eq!(extract_choice("I think option 2"), None);
        assert_eq!(extract_choice("[2]"), None);
        assert_eq!(extract_choice("[[x]]"), None);
    }

    #[test]
    fn test_missing_marker_is_not_correct() {
        let record = AnswerRecord::new("doc", &mc_question(2), "no marker here", vec![1], 10);
        assert_eq!(record.predicted_choice, None);
        assert_eq!(record.correct_choice, Some(false));
        assert!(!record.is_correct());
    }

    #[test]
    fn test_correct_choice() {
        let record = AnswerRecord::new("doc", &mc_question(2), "Reasoning\n[[2]]", vec![0, 3], 42);
        assert_eq!(record.predicted_choice, Some(2));
        assert!(record.is_correct());
        assert_eq!(record.predicted_answer, "Reasoning [[2]]");
        assert!(record.hard);
    }

    #[test]
    fn test_generative_record_has_no_choice() {
        let question = Question {
            question_id: "q-2".to_string(),
            question: "Who wrote it?".to_string(),
            options: None,
            gold_choice: None,
            gold_answers: vec!["Ann".to_string()],
            hard: false,
        };
        let record = AnswerRecord::new("doc", &question, "Ann", vec![], 5);
        assert_eq!(record.correct_choice, None);
        assert_eq!(record.predicted_choice, None);

        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("correct_choice").is_none());
        assert_eq!(json["gold_answers"][0], "Ann");
    }

    #[test]
    fn test_error_record_serialization() {
        let record = ErrorRecord::for_question("doc", "q-9", "rate limit exceeded");
        let json = serde_json::to_string(&record).unwrap();
        let decoded: ErrorRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, record);
    }
}
