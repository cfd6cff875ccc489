//! Append-only JSONL logs for answers and errors.
//!
//! One log is shared by all workers of a batch. Each record is serialized
//! up front and written as a single complete line under the lock, so lines
//! from concurrent documents never interleave.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Suffix of the error log written next to an answer log.
pub const ERROR_LOG_SUFFIX: &str = "_ERRORS";

/// Error type for output logs.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Bad record at {path}:{line}: {source}")]
    Decode {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Log lock poisoned: {0}")]
    Poisoned(PathBuf),
}

/// A JSONL file opened for appending.
pub struct AppendLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl AppendLog {
    /// Open (or create) the log, creating parent directories as needed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, OutputError> {
        let path = path.into();
        let io_error = |source| OutputError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_error)?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as one line.
    pub fn append<T: Serialize>(&self, record: &T) -> Result<(), OutputError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = self
            .file
            .lock()
            .map_err(|_| OutputError::Poisoned(self.path.clone()))?;
        file.write_all(line.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|source| OutputError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

/// Error log path for an answer log: `answers.jsonl` -> `answers_ERRORS.jsonl`.
pub fn error_log_path(answers_path: &Path) -> PathBuf {
    let stem = answers_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "answers".to_string());
    answers_path.with_file_name(format!("{}{}.jsonl", stem, ERROR_LOG_SUFFIX))
}

/// Read every record of a JSONL file. Blank lines are skipped.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, OutputError> {
    let file = File::open(path).map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut records = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|source| OutputError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| OutputError::Decode {
            path: path.to_path_buf(),
            line: index + 1,
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}
