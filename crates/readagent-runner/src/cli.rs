//! CLI argument parsing for the readagent runner.
//!
//! CLI flags override every other configuration source.

use clap::{Parser, Subcommand};

/// ReadAgent experiment runner
///
/// Pages and gists long documents, answers questions by looking pages up,
/// and scores the answer logs.
#[derive(Parser, Debug)]
#[command(name = "readagent")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/readagent/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Runner commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build and save pages and gists for every document in a dataset
    Paginate {
        /// Preprocessed dataset (JSON keyed by document id)
        #[arg(short, long)]
        dataset: String,

        /// Override pages snapshot directory
        #[arg(long)]
        pages_dir: Option<String>,

        /// Override gists snapshot directory
        #[arg(long)]
        gists_dir: Option<String>,

        /// Documents processed in parallel
        #[arg(short, long)]
        workers: Option<usize>,

        /// Keep going when a document fails
        #[arg(long)]
        isolate: bool,

        /// Use the offline mock backend
        #[arg(long)]
        mock: bool,
    },

    /// Answer every question of a dataset from saved pages and gists
    Answer {
        /// Preprocessed dataset (JSON keyed by document id)
        #[arg(short, long)]
        dataset: String,

        /// Override pages snapshot directory
        #[arg(long)]
        pages_dir: Option<String>,

        /// Override gists snapshot directory
        #[arg(long)]
        gists_dir: Option<String>,

        /// Answer log path (default: <answers dir>/<dataset name>.jsonl)
        #[arg(short, long)]
        output: Option<String>,

        /// Upper bound on pages looked up per question
        #[arg(long)]
        max_lookup_pages: Option<usize>,

        /// Documents processed in parallel
        #[arg(short, long)]
        workers: Option<usize>,

        /// Keep going when a document fails
        #[arg(long)]
        isolate: bool,

        /// Use the offline mock backend
        #[arg(long)]
        mock: bool,
    },

    /// Score the answer logs in a folder
    Evaluate {
        /// Folder holding *.jsonl answer logs (default from config)
        #[arg(short, long)]
        answers_dir: Option<String>,

        /// Write the JSON report here
        #[arg(long)]
        json: Option<String>,

        /// Write the CSV report here
        #[arg(long)]
        csv: Option<String>,
    },

    /// Print the effective configuration as TOML
    Config,
}
