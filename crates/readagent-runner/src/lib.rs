//! ReadAgent runner library exports.
//!
//! This crate provides the `readagent` experiment binary.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (paginate, answer, evaluate, config)
//! - `dataset`: Preprocessed dataset loading
//! - `experiment`: Per-document paginate and answer jobs
//! - `batch`: Bounded per-document worker pool
//! - `output`: Append-only JSONL answer and error logs
//! - `eval`: Answer log scoring and reports
//! - `metrics`: Token F1, BLEU and ROUGE-L

pub mod batch;
pub mod cli;
pub mod commands;
pub mod dataset;
pub mod eval;
pub mod experiment;
pub mod metrics;
pub mod output;

pub use batch::{run_batch, BatchError, BatchSummary};
pub use cli::{Cli, Commands};
pub use commands::{
    build_capabilities, init_logging, run_answer, run_evaluate, run_paginate, show_config,
    AnswerOptions, PaginateOptions,
};
pub use dataset::{Dataset, DatasetEntry, DatasetError, DatasetItem};
pub use eval::{evaluate_dir, summarize, EvalError, EvalReport, LogReport};
pub use metrics::{best_token_f1, corpus_bleu, rouge_l, token_f1};
pub use experiment::{
    snapshot_path, AnswerJob, AnswerOutcome, ExperimentError, PaginateJob, PaginateOutcome,
};
pub use output::{error_log_path, read_records, AppendLog, OutputError};
