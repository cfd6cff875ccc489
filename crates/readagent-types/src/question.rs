//! Questions asked against a paged document.

use serde::{Deserialize, Serialize};

/// A dataset question.
///
/// Multiple-choice questions carry `options` and a 1-based `gold_choice`;
/// generative questions carry `gold_answers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question_id: String,

    pub question: String,

    #[serde(default)]
    pub options: Option<Vec<String>>,

    /// 1-based index of the correct option
    #[serde(default)]
    pub gold_choice: Option<u32>,

    #[serde(default)]
    pub gold_answers: Vec<String>,

    /// Difficulty flag carried through to the answer log
    #[serde(default)]
    pub hard: bool,
}

impl Question {
    pub fn is_multiple_choice(&self) -> bool {
        self.options.as_ref().is_some_and(|o| !o.is_empty())
    }
}

/// Question text with options numbered as `[[n]]` markers, used for answering.
pub fn multiple_choice_text(question: &str, options: &[String]) -> String {
    let choices: String = options
        .iter()
        .enumerate()
        .map(|(index, option)| format!("[[{}]]: {} \n", index + 1, option))
        .collect();
    format!("{} \nOptions: \n{}", question, choices)
}

/// Question text with options as plain bullets, used for page lookup.
pub fn multiple_choice_text_unnumbered(question: &str, options: &[String]) -> String {
    let choices: String = options
        .iter()
        .map(|option| format!("- {} \n", option))
        .collect();
    format!("{} \nOptions: \n{}", question, choices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Vec<String> {
        vec!["Red".to_string(), "Blue".to_string()]
    }

    #[test]
    fn test_numbered_text() {
        let text = multiple_choice_text("Which colour?", &options());
        assert_eq!(text, "Which colour? \nOptions: \n[[1]]: Red \n[[2]]: Blue \n");
    }

    #[test]
    fn test_unnumbered_text_has_no_markers() {
        let text = multiple_choice_text_unnumbered("Which colour?", &options());
        assert_eq!(text, "Which colour? \nOptions: \n- Red \n- Blue \n");
        assert!(!text.contains("[["));
    }

    #[test]
    fn test_question_deserializes_with_defaults() {
        let q: Question =
            serde_json::from_str(r#"{"question_id": "q1", "question": "Who?"}"#).unwrap();
        assert!(!q.is_multiple_choice());
        assert!(q.gold_answers.is_empty());
        assert!(!q.hard);
    }
}
