//! ReadAgent runner
//!
//! Pages, gists and answers long-document QA datasets.
//!
//! # Usage
//!
//! ```bash
//! readagent paginate --dataset data.json [--workers N] [--mock]
//! readagent answer --dataset data.json [--output answers.jsonl] [--max-lookup-pages N]
//! readagent evaluate [--answers-dir DIR] [--json PATH] [--csv PATH]
//! readagent config
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/readagent/config.toml)
//! 3. `--config` file
//! 4. Environment variables (READAGENT_*)
//! 5. CLI flags

use anyhow::Result;
use clap::Parser;

use readagent_runner::{
    run_answer, run_evaluate, run_paginate, show_config, AnswerOptions, Cli, Commands,
    PaginateOptions,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config.as_deref();
    let log_level = cli.log_level.as_deref();

    match cli.command {
        Commands::Paginate {
            dataset,
            pages_dir,
            gists_dir,
            workers,
            isolate,
            mock,
        } => {
            let options = PaginateOptions {
                dataset,
                pages_dir,
                gists_dir,
                workers,
                isolate,
                mock,
            };
            run_paginate(config, log_level, options).await?;
        }
        Commands::Answer {
            dataset,
            pages_dir,
            gists_dir,
            output,
            max_lookup_pages,
            workers,
            isolate,
            mock,
        } => {
            let options = AnswerOptions {
                dataset,
                pages_dir,
                gists_dir,
                output,
                max_lookup_pages,
                workers,
                isolate,
                mock,
            };
            run_answer(config, log_level, options).await?;
        }
        Commands::Evaluate {
            answers_dir,
            json,
            csv,
        } => {
            run_evaluate(
                config,
                log_level,
                answers_dir.as_deref(),
                json.as_deref(),
                csv.as_deref(),
            )?;
        }
        Commands::Config => {
            show_config(config, log_level)?;
        }
    }

    Ok(())
}
