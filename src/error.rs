//! Errors raised while loading the precomputed artifacts.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::catalog::TableError;

/// Result alias for artifact loading.
pub type Result<T> = std::result::Result<T, LoadError>;

/// Failure to load one of the precomputed artifacts.
///
/// Every variant is fatal at startup: without all tables the recommender
/// cannot serve a single request.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The artifact file could not be opened or read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Artifact path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The CSV reader rejected the file.
    #[error("malformed CSV in {path}: {source}")]
    Csv {
        /// Artifact path.
        path: PathBuf,
        /// Underlying CSV error.
        source: csv::Error,
    },
    /// A required column is absent from the header row.
    #[error("{path}: column '{column}' not found")]
    MissingColumn {
        /// Artifact path.
        path: PathBuf,
        /// Column name that was looked up.
        column: String,
    },
    /// A cell could not be parsed into the expected type.
    #[error("{path}:{line}: invalid {column} value '{value}'")]
    InvalidValue {
        /// Artifact path.
        path: PathBuf,
        /// 1-based line number.
        line: u64,
        /// Column the cell belongs to.
        column: String,
        /// Raw cell contents.
        value: String,
    },
    /// The parsed rows do not form a valid table.
    #[error("{path}: {source}")]
    Table {
        /// Artifact path.
        path: PathBuf,
        /// Violated table invariant.
        source: TableError,
    },
    /// The artifact parsed but violates a structural invariant.
    #[error("{path}: {message}")]
    Invalid {
        /// Artifact path.
        path: PathBuf,
        /// Description of the violation.
        message: String,
    },
}

impl LoadError {
    pub(crate) fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        LoadError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn csv(path: impl AsRef<Path>, source: csv::Error) -> Self {
        LoadError::Csv {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn table(path: impl AsRef<Path>, source: TableError) -> Self {
        LoadError::Table {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn invalid(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        LoadError::Invalid {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }
}
