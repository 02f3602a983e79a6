#![forbid(unsafe_code)]

//! Loading and saving the catalog.
//!
//! The store only sees the [`Persistence`] trait: `load_all` once at startup,
//! `save_all` after every successful mutation. [`FlatFile`] implements it on
//! top of the sectioned text format in [`flat`]; [`MemoryPersistence`] keeps
//! the last saved dataset in memory.

pub mod export;
pub mod flat;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::Dataset;

/// Error type for persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Reading the data file failed.
    #[error("failed to read data file {path}: {source}")]
    Read {
        /// File being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Writing the data file failed.
    #[error("failed to write data file {path}: {source}")]
    Write {
        /// File being written.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// A line of the data file could not be decoded.
    #[error("{path}:{line}: {message}")]
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        message: String,
    },
    /// CSV encoding failed.
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// I/O error outside the data file itself.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Source and sink of full datasets.
pub trait Persistence: Send + Sync {
    /// Loads every row.
    fn load_all(&self) -> Result<Dataset, PersistError>;
    /// Replaces the stored rows with `data`.
    fn save_all(&self, data: &Dataset) -> Result<(), PersistError>;
}

impl<P: Persistence + ?Sized> Persistence for Arc<P> {
    fn load_all(&self) -> Result<Dataset, PersistError> {
        (**self).load_all()
    }

    fn save_all(&self, data: &Dataset) -> Result<(), PersistError> {
        (**self).save_all(data)
    }
}

/// Sectioned text file on disk.
#[derive(Clone, Debug)]
pub struct FlatFile {
    path: PathBuf,
}

impl FlatFile {
    /// Uses `path` for both loading and saving.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the data file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Persistence for FlatFile {
    /// A missing file loads as an empty dataset.
    fn load_all(&self) -> Result<Dataset, PersistError> {
        if !self.path.exists() {
            warn!(path = %self.path.display(), "data file missing; starting empty");
            return Ok(Dataset::default());
        }
        let text = fs::read_to_string(&self.path).map_err(|source| PersistError::Read {
            path: self.path.clone(),
            source,
        })?;
        let data = flat::parse(&text).map_err(|err| PersistError::Parse {
            path: self.path.clone(),
            line: err.line,
            message: err.message,
        })?;
        debug!(
            path = %self.path.display(),
            rows = data.row_count(),
            "data file loaded"
        );
        Ok(data)
    }

    fn save_all(&self, data: &Dataset) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| PersistError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        // Staged next to the target, then renamed over it.
        let staging = self.path.with_extension("tmp");
        let text = flat::render(data)?;
        fs::write(&staging, text).map_err(|source| PersistError::Write {
            path: staging.clone(),
            source,
        })?;
        fs::rename(&staging, &self.path).map_err(|source| PersistError::Write {
            path: self.path.clone(),
            source,
        })?;
        debug!(
            path = %self.path.display(),
            rows = data.row_count(),
            "data file saved"
        );
        Ok(())
    }
}

/// Keeps the last saved dataset in memory.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    data: Mutex<Dataset>,
    saves: Mutex<usize>,
}

impl MemoryPersistence {
    /// Starts with `data` as the stored dataset.
    pub fn new(data: Dataset) -> Self {
        Self {
            data: Mutex::new(data),
            saves: Mutex::new(0),
        }
    }

    /// Number of `save_all` calls so far.
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }

    /// Copy of the stored dataset.
    pub fn stored(&self) -> Dataset {
        self.data.lock().clone()
    }
}

impl Persistence for MemoryPersistence {
    fn load_all(&self) -> Result<Dataset, PersistError> {
        Ok(self.data.lock().clone())
    }

    fn save_all(&self, data: &Dataset) -> Result<(), PersistError> {
        *self.data.lock() = data.clone();
        *self.saves.lock() += 1;
        Ok(())
    }
}
