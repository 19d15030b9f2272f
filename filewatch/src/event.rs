//! File events produced by watcher workers.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::Action;

/// A normalized file system change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEvent {
    /// The kind of event.
    pub kind: FileEventKind,

    /// When the change was observed.
    pub timestamp: DateTime<Utc>,

    /// Watched root joined with the name reported by the OS.
    pub path: PathBuf,
}

impl FileEvent {
    /// Create a new file event stamped with the current time.
    pub fn new(kind: FileEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
            path: path.into(),
        }
    }

    /// Timestamp as seconds since the Unix epoch.
    pub fn timestamp_secs(&self) -> f64 {
        self.timestamp.timestamp_micros() as f64 / 1_000_000.0
    }
}

/// Kind of file event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileEventKind {
    /// File was created, or renamed into place.
    Create,

    /// File contents were written.
    Modify,

    /// File was deleted, or renamed away.
    Remove,

    /// Unrecognized action. Never queued.
    Unknown,
}

impl From<Action> for FileEventKind {
    fn from(action: Action) -> Self {
        match action {
            Action::Added | Action::RenamedNewName => Self::Create,
            Action::Removed | Action::RenamedOldName => Self::Remove,
            Action::Modified => Self::Modify,
            Action::Other(_) => Self::Unknown,
        }
    }
}

impl std::fmt::Display for FileEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Modify => "modify",
            Self::Remove => "remove",
            Self::Unknown => "unknown",
        };
        f.pad(name)
    }
}
