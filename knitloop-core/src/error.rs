//! Error types for knitloop-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading the backend configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read backend config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error. Includes the file path and serde_yaml's line context.
    #[error("failed to parse backend config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The file parsed but a value is unusable.
    #[error("invalid backend config {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

/// Errors from spool operations.
#[derive(Debug, Error)]
pub enum SpoolError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed work item {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid work item id '{0}': must be non-empty and contain only [A-Za-z0-9._-]")]
    InvalidId(String),
}

/// A loop type name that is not one of the known loop types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "unknown loop type '{0}'; expected: projection, initialize, run_management, \
     finishing, garbage_collection, housekeeping"
)]
pub struct ParseLoopTypeError(pub String);

/// Convenience constructor for [`SpoolError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SpoolError {
    SpoolError::Io {
        path: path.into(),
        source,
    }
}
