//! Storage error handling
//!
//! Typed errors for the key/value backends. I/O failures are classified by
//! cause so the CLI can print a useful hint.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a storage backend or while decoding a collection
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Cannot create data directory '{path}': {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Permission denied for '{path}'")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No space left while writing '{path}'")]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("'{path}' does not exist")]
    Missing { path: PathBuf },

    #[error("Cannot read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The temp file was written but could not replace the collection file
    #[error("Cannot replace '{to}' with '{from}': {source}")]
    Replace {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Stored collection is not valid JSON for its record type
    #[error("Collection '{key}' is corrupted: {details}")]
    CorruptCollection { key: String, details: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StorageError {
    /// Classify an I/O failure on `path`
    pub fn from_io(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => StorageError::PermissionDenied {
                path,
                source: error,
            },
            io::ErrorKind::NotFound => StorageError::Missing { path },
            _ if is_disk_full(&error) => StorageError::DiskFull {
                path,
                source: error,
            },
            _ => StorageError::Write {
                path,
                source: error,
            },
        }
    }

    /// Wrap a JSON decode failure for a named collection
    pub fn corrupt(key: impl Into<String>, error: serde_json::Error) -> Self {
        StorageError::CorruptCollection {
            key: key.into(),
            details: error.to_string(),
        }
    }

    /// Whether the user can fix the cause and retry
    pub fn is_recoverable(&self) -> bool {
        self.recovery_suggestion().is_some()
    }

    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::DiskFull { .. } => Some("Free up disk space and run the command again."),
            StorageError::PermissionDenied { .. } => Some(
                "Check ownership of the data directory, or point data_dir elsewhere with `courtline config set data_dir <path>`.",
            ),
            StorageError::DataDir { .. } => {
                Some("Check that the parent directory exists and is writable.")
            }
            StorageError::CorruptCollection { .. } => Some(
                "Fix the stored JSON by hand, or remove the collection and re-enter its records.",
            ),
            _ => None,
        }
    }
}

fn is_disk_full(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    ["no space left", "disk full", "quota exceeded", "not enough space"]
        .iter()
        .any(|needle| msg.contains(needle))
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
