//! Error types for the file watch subsystem.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for file watch operations.
pub type Result<T> = std::result::Result<T, WatchError>;

/// Errors that can occur in the file watch subsystem.
#[derive(Error, Debug)]
pub enum WatchError {
    /// A platform watch handle could not be acquired for a path.
    #[error("cannot watch {path}: {reason}")]
    ResourceUnavailable { path: PathBuf, reason: String },

    /// `start` was called before `init`.
    #[error("file watch used before init")]
    NotInitialized,

    /// The subsystem has been shut down.
    #[error("file watch has been shut down")]
    ShutDown,

    /// The registry cannot change while workers are running.
    #[error("cannot register {0} while watching is started")]
    AlreadyWatching(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Notify error.
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WatchError {
    pub(crate) fn unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ResourceUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
