//! Command implementations for the readagent runner.
//!
//! Handles:
//! - paginate: build pages and gists for a dataset
//! - answer: answer a dataset's questions into JSONL logs
//! - evaluate: score answer logs
//! - config: print the effective configuration

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use readagent_llm::{ApiConfig, LlmBackend, MockBackend, RetryPolicy, Retrying};
use readagent_pager::Capabilities;
use readagent_types::{BatchPolicy, Document, Question, Settings};

use crate::batch::run_batch;
use crate::dataset::Dataset;
use crate::eval::{evaluate_dir, write_csv, write_json};
use crate::experiment::{AnswerJob, PaginateJob};
use crate::output::{error_log_path, AppendLog};

/// Options of the `paginate` command.
#[derive(Debug, Clone, Default)]
pub struct PaginateOptions {
    pub dataset: String,
    pub pages_dir: Option<String>,
    pub gists_dir: Option<String>,
    pub workers: Option<usize>,
    pub isolate: bool,
    pub mock: bool,
}

/// Options of the `answer` command.
#[derive(Debug, Clone, Default)]
pub struct AnswerOptions {
    pub dataset: String,
    pub pages_dir: Option<String>,
    pub gists_dir: Option<String>,
    pub output: Option<String>,
    pub max_lookup_pages: Option<usize>,
    pub workers: Option<usize>,
    pub isolate: bool,
    pub mock: bool,
}

/// Load settings and apply the global CLI overrides.
fn load_settings(config_path: Option<&str>, log_level: Option<&str>) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(level) = log_level {
        settings.log_level = level.to_string();
    }
    Ok(settings)
}

fn apply_batch_overrides(settings: &mut Settings, workers: Option<usize>, isolate: bool) -> Result<()> {
    if let Some(workers) = workers {
        settings.runner.max_workers = workers;
    }
    if isolate {
        settings.runner.batch_policy = BatchPolicy::Isolate;
    }
    settings.validate().context("Invalid configuration")?;
    Ok(())
}

/// Initialize logging. `RUST_LOG` wins over the configured level.
pub fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Capabilities backed by the configured API (with retries) or the mock.
pub fn build_capabilities(settings: &Settings, mock: bool) -> Result<Capabilities> {
    if mock {
        info!("Using offline mock backend");
        return Ok(Capabilities::from_backend(Arc::new(MockBackend::new())));
    }

    let config = ApiConfig::from_settings(&settings.llm).context("Failed to configure LLM backend")?;
    let backend = LlmBackend::new(config).context("Failed to create LLM backend")?;
    info!(
        provider = %settings.llm.provider,
        model = backend.model(),
        max_attempts = settings.retry.max_attempts,
        "Using API backend"
    );

    let policy = RetryPolicy::from(&settings.retry);
    Ok(Capabilities::from_backend(Arc::new(Retrying::new(backend, policy))))
}

fn dir_or(override_dir: Option<&str>, default: PathBuf) -> PathBuf {
    override_dir.map(PathBuf::from).unwrap_or(default)
}

/// Default answer log: `<answers dir>/<dataset file stem>.jsonl`.
fn default_answers_path(settings: &Settings, dataset: &Path) -> PathBuf {
    let stem = dataset
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "answers".to_string());
    settings.runner.answers_dir().join(format!("{}.jsonl", stem))
}

/// Build and save pages and gists for every dataset document.
pub async fn run_paginate(
    config_path: Option<&str>,
    log_level: Option<&str>,
    options: PaginateOptions,
) -> Result<()> {
    let mut settings = load_settings(config_path, log_level)?;
    apply_batch_overrides(&mut settings, options.workers, options.isolate)?;
    init_logging(&settings.log_level)?;

    let dataset = Dataset::load(Path::new(&options.dataset)).context("Failed to load dataset")?;
    let job = Arc::new(PaginateJob {
        capabilities: build_capabilities(&settings, options.mock)?,
        pagination: settings.pagination.clone(),
        pages_dir: dir_or(options.pages_dir.as_deref(), settings.runner.pages_dir()),
        gists_dir: dir_or(options.gists_dir.as_deref(), settings.runner.gists_dir()),
    });

    info!(
        documents = dataset.len(),
        workers = settings.runner.max_workers,
        pages_dir = %job.pages_dir.display(),
        gists_dir = %job.gists_dir.display(),
        "Starting pagination"
    );

    let items: Vec<(String, Document)> = dataset
        .items()
        .into_iter()
        .map(|item| (item.document.doc_id.clone(), item.document))
        .collect();

    let summary = run_batch(
        items,
        settings.runner.max_workers,
        settings.runner.batch_policy,
        move |document: Document| {
            let job = Arc::clone(&job);
            async move { job.run(&document).await.map(|_| ()) }
        },
    )
    .await
    .context("Pagination failed")?;

    println!(
        "Paginated {} document(s), {} failed",
        summary.succeeded, summary.failed
    );
    Ok(())
}

/// Answer every dataset question into an answer log and an error log.
pub async fn run_answer(
    config_path: Option<&str>,
    log_level: Option<&str>,
    options: AnswerOptions,
) -> Result<()> {
    let mut settings = load_settings(config_path, log_level)?;
    if let Some(max_lookup_pages) = options.max_lookup_pages {
        settings.lookup.max_lookup_pages = max_lookup_pages;
    }
    apply_batch_overrides(&mut settings, options.workers, options.isolate)?;
    init_logging(&settings.log_level)?;

    let dataset_path = PathBuf::from(&options.dataset);
    let dataset = Dataset::load(&dataset_path).context("Failed to load dataset")?;

    let answers_path = options
        .output
        .map(PathBuf::from)
        .unwrap_or_else(|| default_answers_path(&settings, &dataset_path));
    let errors_path = error_log_path(&answers_path);
    let answers = AppendLog::open(&answers_path).context("Failed to open answer log")?;
    let errors = AppendLog::open(&errors_path).context("Failed to open error log")?;

    let job = Arc::new(AnswerJob {
        capabilities: build_capabilities(&settings, options.mock)?,
        pagination: settings.pagination.clone(),
        max_lookup_pages: settings.lookup.max_lookup_pages,
        pages_dir: dir_or(options.pages_dir.as_deref(), settings.runner.pages_dir()),
        gists_dir: dir_or(options.gists_dir.as_deref(), settings.runner.gists_dir()),
        answers: Arc::new(answers),
        errors: Arc::new(errors),
    });

    info!(
        documents = dataset.len(),
        questions = dataset.question_count(),
        workers = settings.runner.max_workers,
        answers = %answers_path.display(),
        "Starting answering"
    );

    let items: Vec<(String, (String, Vec<Question>))> = dataset
        .items()
        .into_iter()
        .map(|item| {
            let doc_id = item.document.doc_id;
            (doc_id.clone(), (doc_id, item.questions))
        })
        .collect();

    let summary = run_batch(
        items,
        settings.runner.max_workers,
        settings.runner.batch_policy,
        move |(doc_id, questions): (String, Vec<Question>)| {
            let job = Arc::clone(&job);
            async move { job.run(&doc_id, &questions).await.map(|_| ()) }
        },
    )
    .await
    .context("Answering failed")?;

    println!(
        "Answered {} document(s), {} failed",
        summary.succeeded, summary.failed
    );
    println!("Answers: {}", answers_path.display());
    println!("Errors:  {}", errors_path.display());
    Ok(())
}

/// Score the answer logs in a folder and write JSON and CSV reports.
pub fn run_evaluate(
    config_path: Option<&str>,
    log_level: Option<&str>,
    answers_dir: Option<&str>,
    json_path: Option<&str>,
    csv_path: Option<&str>,
) -> Result<()> {
    let settings = load_settings(config_path, log_level)?;
    init_logging(&settings.log_level)?;

    let answers_dir = dir_or(answers_dir, settings.runner.answers_dir());
    let report = evaluate_dir(&answers_dir).context("Failed to evaluate answer logs")?;

    let json_path = dir_or(json_path, answers_dir.join("evaluation_results.json"));
    let csv_path = dir_or(csv_path, answers_dir.join("evaluation_results.csv"));
    write_json(&report, &json_path)?;
    write_csv(&report, &csv_path)?;

    let score = |value: Option<f64>| value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v));
    println!("File\tTotal\tCorrect\tAccuracy (%)\tAvg Tokens\tF1\tROUGE-L");
    for log in &report.logs {
        println!(
            "{}\t{}\t{}\t{:.2}\t{:.2}\t{}\t{}",
            log.file,
            log.total_entries,
            log.correct,
            log.accuracy,
            log.avg_tokens,
            score(log.f1),
            score(log.rouge_l)
        );
    }
    println!("JSON report: {}", json_path.display());
    println!("CSV report:  {}", csv_path.display());
    Ok(())
}

/// Print the effective configuration. The API key is masked.
pub fn show_config(config_path: Option<&str>, log_level: Option<&str>) -> Result<()> {
    let mut settings = load_settings(config_path, log_level)?;
    if settings.llm.api_key.is_some() {
        settings.llm.api_key = Some("********".to_string());
    }
    let rendered = toml::to_string_pretty(&settings).context("Failed to render configuration")?;
    print!("{}", rendered);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_answers_path_uses_dataset_stem() {
        let mut settings = Settings::default();
        settings.runner.artifacts_dir = "/data/artifacts".to_string();

        let path = default_answers_path(&settings, Path::new("/datasets/quality_dev.json"));
        assert_eq!(path, PathBuf::from("/data/artifacts/answers/quality_dev.jsonl"));
    }

    #[test]
    fn test_batch_overrides() {
        let mut settings = Settings::default();
        apply_batch_overrides(&mut settings, Some(7), true).unwrap();
        assert_eq!(settings.runner.max_workers, 7);
        assert_eq!(settings.runner.batch_policy, BatchPolicy::Isolate);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut settings = Settings::default();
        assert!(apply_batch_overrides(&mut settings, Some(0), false).is_err());
    }

    #[test]
    fn test_mock_capabilities_need_no_key() {
        let settings = Settings::default();
        assert!(build_capabilities(&settings, true).is_ok());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let mut settings = Settings::default();
        settings.llm.provider = "nonexistent".to_string();
        settings.llm.api_key = Some("key".to_string());
        assert!(build_capabilities(&settings, false).is_err());
    }
}
