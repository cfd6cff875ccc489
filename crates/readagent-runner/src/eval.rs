//! Evaluation of answer logs.
//!
//! Every `*.jsonl` answer log in a folder is scored on its own. Error logs
//! (`*_ERRORS.jsonl`) are skipped. Reports are written as pretty JSON and as
//! `;`-separated CSV with decimal commas.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use readagent_types::AnswerRecord;

use crate::metrics::{best_token_f1, corpus_bleu, rouge_l};
use crate::output::{read_records, OutputError, ERROR_LOG_SUFFIX};

/// Error type for evaluation.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("Failed to scan answers folder: {0}")]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("Failed to write report {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Scores for one answer log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogReport {
    pub file: String,
    pub documents: usize,
    pub total_entries: usize,
    pub correct: usize,
    pub accuracy: f64,
    pub avg_tokens: f64,
    pub hard_entries: usize,
    pub hard_correct: usize,
    pub hard_accuracy: f64,
    pub non_hard_entries: usize,
    pub non_hard_correct: usize,
    pub non_hard_accuracy: f64,
    /// Questions with reference answers
    pub f1_questions: usize,
    /// Mean best-match token F1 (0-100) over `f1_questions`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub f1: Option<f64>,
    /// Corpus BLEU-1 (0-100) over `f1_questions`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bleu1: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bleu4: Option<f64>,
    /// Mean best-match ROUGE-L F-measure (0-100)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rouge_l: Option<f64>,
}

/// Scores for every answer log in a folder.
#[derive(Debug, Clone, Serialize)]
pub struct EvalReport {
    pub generated_at: DateTime<Utc>,
    pub answers_dir: String,
    pub logs: Vec<LogReport>,
}

/// Score every answer log directly inside `dir`, in file name order.
pub fn evaluate_dir(dir: &Path) -> Result<EvalReport, EvalError> {
    let mut logs = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || !is_answer_log(path) {
            continue;
        }

        let records: Vec<AnswerRecord> = read_records(path)?;
        let file = entry.file_name().to_string_lossy().to_string();
        debug!(file = %file, records = records.len(), "Scoring answer log");
        logs.push(summarize(file, &records));
    }

    info!(dir = %dir.display(), logs = logs.len(), "Evaluation done");
    Ok(EvalReport {
        generated_at: Utc::now(),
        answers_dir: dir.display().to_string(),
        logs,
    })
}

fn is_answer_log(path: &Path) -> bool {
    let is_jsonl = path.extension().is_some_and(|ext| ext == "jsonl");
    let is_error_log = path
        .file_stem()
        .is_some_and(|stem| stem.to_string_lossy().ends_with(ERROR_LOG_SUFFIX));
    is_jsonl && !is_error_log
}

/// Score one log's records.
pub fn summarize(file: impl Into<String>, records: &[AnswerRecord]) -> LogReport {
    let documents: BTreeSet<&str> = records.iter().map(|r| r.document_id.as_str()).collect();
    let (hard, non_hard): (Vec<&AnswerRecord>, Vec<&AnswerRecord>) =
        records.iter().partition(|r| r.hard);

    let correct = records.iter().filter(|r| r.is_correct()).count();
    let hard_correct = hard.iter().filter(|r| r.is_correct()).count();
    let non_hard_correct = non_hard.iter().filter(|r| r.is_correct()).count();
    let total_tokens: usize = records.iter().map(|r| r.used_tokens).sum();

    let generative: Vec<&AnswerRecord> = records
        .iter()
        .filter(|r| r.gold_answers.iter().any(|g| !g.trim().is_empty()))
        .collect();
    let mean_of = |score: fn(&str, &[String]) -> f64| {
        let total: f64 = generative
            .iter()
            .map(|r| score(&r.predicted_answer, &r.gold_answers))
            .sum();
        round2(100.0 * total / generative.len() as f64)
    };
    let bleu = |max_order| {
        let samples = generative
            .iter()
            .map(|r| (r.predicted_answer.as_str(), r.gold_answers.as_slice()));
        round2(100.0 * corpus_bleu(samples, max_order))
    };
    let has_references = !generative.is_empty();

    LogReport {
        file: file.into(),
        documents: documents.len(),
        total_entries: records.len(),
        correct,
        accuracy: percent(correct, records.len()),
        avg_tokens: round2(ratio(total_tokens, records.len())),
        hard_entries: hard.len(),
        hard_correct,
        hard_accuracy: percent(hard_correct, hard.len()),
        non_hard_entries: non_hard.len(),
        non_hard_correct,
        non_hard_accuracy: percent(non_hard_correct, non_hard.len()),
        f1_questions: generative.len(),
        f1: has_references.then(|| mean_of(best_token_f1)),
        bleu1: has_references.then(|| bleu(1)),
        bleu4: has_references.then(|| bleu(4)),
        rouge_l: has_references.then(|| mean_of(rouge_l)),
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    round2(100.0 * ratio(part, whole))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn write_json(report: &EvalReport, path: &Path) -> Result<(), EvalError> {
    let json = serde_json::to_string_pretty(report)?;
    write_report(path, &json)
}

pub fn write_csv(report: &EvalReport, path: &Path) -> Result<(), EvalError> {
    write_report(path, &to_csv(report))
}

/// `;`-separated rows with decimal commas.
pub fn to_csv(report: &EvalReport) -> String {
    let mut out = String::from(
        "File;Documents;Total Entries;Correct;Accuracy (%);Avg Tokens;Hard Entries;Hard Correct;\
         Hard Accuracy (%);Non-Hard Entries;Non-Hard Correct;Non-Hard Accuracy (%);F1 Questions;F1;\
         BLEU-1;BLEU-4;ROUGE-L\n",
    );
    for log in &report.logs {
        let row = [
            csv_field(&log.file),
            log.documents.to_string(),
            log.total_entries.to_string(),
            log.correct.to_string(),
            decimal_comma(log.accuracy),
            decimal_comma(log.avg_tokens),
            log.hard_entries.to_string(),
            log.hard_correct.to_string(),
            decimal_comma(log.hard_accuracy),
            log.non_hard_entries.to_string(),
            log.non_hard_correct.to_string(),
            decimal_comma(log.non_hard_accuracy),
            log.f1_questions.to_string(),
            log.f1.map(decimal_comma).unwrap_or_default(),
            log.bleu1.map(decimal_comma).unwrap_or_default(),
            log.bleu4.map(decimal_comma).unwrap_or_default(),
            log.rouge_l.map(decimal_comma).unwrap_or_default(),
        ];
        out.push_str(&row.join(";"));
        out.push('\n');
    }
    out
}

/// Quote text holding the separator, a quote or a line break.
fn csv_field(text: &str) -> String {
    if text.contains([';', '"', '\n', '\r']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

fn decimal_comma(value: f64) -> String {
    format!("{:.2}", value).replace('.', ",")
}

fn write_report(path: &Path, contents: &str) -> Result<(), EvalError> {
    let io_error = |source| EvalError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(path, contents).map_err(io_error)?;
    info!(path = %path.display(), "Wrote report");
    Ok(())
}
