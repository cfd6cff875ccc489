//! Per-document episodic memory and its JSON snapshots.
//!
//! Snapshot shapes:
//! - pages: `[["sentence", ...], ...]`
//! - gists: `["gist", ...]`

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use readagent_types::{Gist, Page, Sentence};

/// Error type for snapshot files.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Snapshot not found: {0}")]
    NotFound(PathBuf),

    #[error("Malformed snapshot {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Error type for memory consistency checks.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Gists do not cover pages: {pages} pages, {gists} gists")]
    CoverageMismatch { pages: usize, gists: usize },
}

/// Pages and gists for one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStore {
    pages: Vec<Page>,
    gists: Vec<Gist>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(pages: Vec<Page>, gists: Vec<Gist>) -> Self {
        Self { pages, gists }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn gists(&self) -> &[Gist] {
        &self.gists
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Replace the pages. Existing gists no longer describe them and are
    /// dropped.
    pub fn set_pages(&mut self, pages: Vec<Page>) {
        self.pages = pages;
        self.gists.clear();
    }

    pub fn set_gists(&mut self, gists: Vec<Gist>) {
        self.gists = gists;
    }

    /// Check there is exactly one gist per page.
    pub fn ensure_coverage(&self) -> Result<(), StoreError> {
        if self.gists.len() != self.pages.len() {
            return Err(StoreError::CoverageMismatch {
                pages: self.pages.len(),
                gists: self.gists.len(),
            });
        }
        Ok(())
    }

    pub fn save_pages(&self, path: &Path) -> Result<(), SnapshotError> {
        write_snapshot(path, &self.pages)?;
        debug!(path = %path.display(), pages = self.pages.len(), "Saved pages");
        Ok(())
    }

    /// Load pages, replacing the current ones and dropping their gists.
    ///
    /// Load gists after pages.
    pub fn load_pages(&mut self, path: &Path) -> Result<(), SnapshotError> {
        let raw: Vec<Vec<String>> = read_snapshot(path)?;
        if let Some(index) = raw.iter().position(Vec::is_empty) {
            return Err(SnapshotError::Malformed {
                path: path.to_path_buf(),
                reason: format!("page {} has no sentences", index),
            });
        }

        self.set_pages(
            raw.into_iter()
                .map(|page| Page::new(page.into_iter().map(Sentence::from).collect()))
                .collect(),
        );
        debug!(path = %path.display(), pages = self.pages.len(), "Loaded pages");
        Ok(())
    }

    pub fn save_gists(&self, path: &Path) -> Result<(), SnapshotError> {
        write_snapshot(path, &self.gists)?;
        debug!(path = %path.display(), gists = self.gists.len(), "Saved gists");
        Ok(())
    }

    pub fn load_gists(&mut self, path: &Path) -> Result<(), SnapshotError> {
        self.gists = read_snapshot(path)?;
        debug!(path = %path.display(), gists = self.gists.len(), "Loaded gists");
        Ok(())
    }
}

fn write_snapshot<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), SnapshotError> {
    let io_error = |source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).map_err(io_error)
}

fn read_snapshot<T: DeserializeOwned>(path: &Path) -> Result<T, SnapshotError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(SnapshotError::NotFound(path.to_path_buf()))
        }
        Err(source) => {
            return Err(SnapshotError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_str(&contents).map_err(|e| SnapshotError::Malformed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
