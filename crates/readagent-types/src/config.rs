//! Configuration loading for readagent.
//!
//! Layered config: defaults -> user config file -> `--config` file ->
//! `READAGENT_*` env vars -> CLI flags (applied by the caller).

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ReadAgentError;

/// Page builder parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Stop growing a candidate window once it holds this many words
    pub word_limit: usize,

    /// Running word count after which sentence boundaries get numeric tags
    pub start_threshold: usize,

    /// Windows below this word count skip the oracle and close the document
    pub min_words_to_start_pagination: usize,

    /// Use the full window when the oracle gives no valid pause point
    pub allow_fallback_to_last: bool,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            word_limit: 600,
            start_threshold: 280,
            min_words_to_start_pagination: 350,
            allow_fallback_to_last: true,
        }
    }
}

impl PaginationConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.word_limit == 0 {
            return Err("word_limit must be > 0".to_string());
        }
        if self.start_threshold > self.word_limit {
            return Err(format!(
                "start_threshold ({}) must not exceed word_limit ({})",
                self.start_threshold, self.word_limit
            ));
        }
        Ok(())
    }
}

/// Lookup-and-answer parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Upper bound on pages the selector is asked to expand
    pub max_lookup_pages: usize,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self { max_lookup_pages: 6 }
    }
}

/// Language-model backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Provider name ("openai" or "anthropic")
    pub provider: String,

    /// Model name (e.g., "gpt-4o-mini")
    pub model: String,

    /// API key (normally taken from the environment)
    pub api_key: Option<String>,

    /// API base URL (for custom or compatible endpoints)
    pub api_base_url: Option<String>,

    /// Per-request timeout
    pub timeout_secs: u64,

    /// Completion length cap
    pub max_decode_steps: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            api_base_url: None,
            timeout_secs: 60,
            max_decode_steps: 512,
        }
    }
}

impl LlmSettings {
    /// Configured key, or the provider's conventional environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Some(key.clone());
        }
        let var = match self.provider.as_str() {
            "anthropic" | "claude" => "ANTHROPIC_API_KEY",
            _ => "OPENAI_API_KEY",
        };
        std::env::var(var).ok().filter(|k| !k.is_empty())
    }
}

/// Exponential backoff settings for capability calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_interval_ms: u64,
    pub multiplier: f64,
    pub max_interval_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_interval_ms: 1000,
            multiplier: 2.0,
            max_interval_secs: 60,
        }
    }
}

/// What a batch does when one document fails.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// Abort the remaining documents on the first failure
    #[default]
    FailFast,
    /// Record the failure and keep processing other documents
    Isolate,
}

/// Batch runner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSettings {
    /// Documents processed in parallel
    pub max_workers: usize,

    pub batch_policy: BatchPolicy,

    /// Root directory for page/gist snapshots and answer logs
    pub artifacts_dir: String,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            max_workers: 4,
            batch_policy: BatchPolicy::default(),
            artifacts_dir: default_artifacts_dir(),
        }
    }
}

impl RunnerSettings {
    pub fn pages_dir(&self) -> PathBuf {
        PathBuf::from(&self.artifacts_dir).join("pages")
    }

    pub fn gists_dir(&self) -> PathBuf {
        PathBuf::from(&self.artifacts_dir).join("gists")
    }

    pub fn answers_dir(&self) -> PathBuf {
        PathBuf::from(&self.artifacts_dir).join("answers")
    }
}

fn default_artifacts_dir() -> String {
    ProjectDirs::from("", "", "readagent")
        .map(|p| p.data_local_dir().join("artifacts"))
        .unwrap_or_else(|| PathBuf::from("./artifacts"))
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub pagination: PaginationConfig,

    #[serde(default)]
    pub lookup: LookupConfig,

    #[serde(default)]
    pub llm: LlmSettings,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub runner: RunnerSettings,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pagination: PaginationConfig::default(),
            lookup: LookupConfig::default(),
            llm: LlmSettings::default(),
            retry: RetrySettings::default(),
            runner: RunnerSettings::default(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/readagent/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (READAGENT_*, nested keys joined by `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, ReadAgentError> {
        let config_dir = ProjectDirs::from("", "", "readagent")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("log_level", default_log_level())
            .map_err(|e| ReadAgentError::Config(e.to_string()))?
            .set_default("runner.artifacts_dir", default_artifacts_dir())
            .map_err(|e| ReadAgentError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Format: READAGENT_LOG_LEVEL, READAGENT_PAGINATION__WORD_LIMIT, ...
        builder = builder.add_source(
            Environment::with_prefix("READAGENT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| ReadAgentError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| ReadAgentError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate all sections.
    pub fn validate(&self) -> Result<(), ReadAgentError> {
        self.pagination.validate().map_err(ReadAgentError::Config)?;
        if self.lookup.max_lookup_pages == 0 {
            return Err(ReadAgentError::Config(
                "lookup.max_lookup_pages must be > 0".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ReadAgentError::Config(
                "retry.max_attempts must be > 0".to_string(),
            ));
        }
        if self.runner.max_workers == 0 {
            return Err(ReadAgentError::Config(
                "runner.max_workers must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
