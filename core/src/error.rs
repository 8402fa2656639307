//! Error types for pathveil.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, PathveilError>;

/// Errors surfaced by fallible I/O below the resolver boundary.
///
/// Aggregation and resolution never propagate these to callers; they are
/// converted into validation-error strings on the result objects. Only the
/// watcher and the explicit config mutation helpers return them directly.
#[derive(Debug, thiserror::Error)]
pub enum PathveilError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),
}

impl PathveilError {
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}
