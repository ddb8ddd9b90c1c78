//! Error module.
//! One error type for the link store and editor, mapped to process exit codes by `main`.

use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the store, editor and renderer.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The config file is not valid JSON or does not have the expected shape.
    #[error("malformed config {path}: {reason}")]
    MalformedConfig { path: PathBuf, reason: String },

    /// Rejected input to an add or edit.
    #[error("validation error: {0}")]
    Validation(String),

    /// No entry has the requested id.
    #[error("no link with id '{0}'")]
    NotFound(String),

    /// A file system operation failed.
    #[error("I/O error accessing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LinkError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LinkError::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            LinkError::Validation(_) => 1,
            LinkError::NotFound(_) => 2,
            LinkError::MalformedConfig { .. } => 3,
            LinkError::Io { .. } => 4,
        }
    }
}

pub type Result<T> = std::result::Result<T, LinkError>;
