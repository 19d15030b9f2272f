//! Configuration types for file watching.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WatchError};
use crate::record::RECORD_HEADER_LEN;

/// Default size of each worker's notification buffer, in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Smallest buffer that can hold a record with a short name.
pub const MIN_BUFFER_SIZE: usize = RECORD_HEADER_LEN * 4;

/// Configuration for the file watch subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Directories registered on construction.
    pub paths: Vec<PathBuf>,

    /// Whether file watching is enabled at all.
    pub enabled: bool,

    /// Size of each worker's notification buffer, in bytes.
    pub buffer_size: usize,

    /// Cadence used by the drain scheduler, in milliseconds.
    pub drain_interval_ms: u64,
}

impl WatchConfig {
    /// Create a config with default values and no paths.
    pub fn new() -> Self {
        Self {
            paths: Vec::new(),
            enabled: true,
            buffer_size: DEFAULT_BUFFER_SIZE,
            drain_interval_ms: 16,
        }
    }

    /// Add a directory to watch.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.push(path.into());
        self
    }

    /// Set the notification buffer size.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Set the drain cadence.
    pub fn with_drain_interval(mut self, interval: Duration) -> Self {
        self.drain_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Disable file watching.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Drain cadence as a [`Duration`].
    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }

    /// Check that the values are usable.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size < MIN_BUFFER_SIZE {
            return Err(WatchError::Config(format!(
                "buffer_size must be at least {MIN_BUFFER_SIZE} bytes, got {}",
                self.buffer_size
            )));
        }
        if self.drain_interval_ms == 0 {
            return Err(WatchError::Config(
                "drain_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self::new()
    }
}
