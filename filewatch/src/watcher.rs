//! Lifecycle controller for the file watch subsystem.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::WatchConfig;
use crate::dispatch::{Dispatcher, EventSink};
use crate::error::{Result, WatchError};
use crate::platform::{NotifyBackend, WatchBackend};
use crate::queue::EventQueue;
use crate::registry::WatchRegistry;
use crate::worker::{WatcherWorker, WorkerState};

/// The file watch subsystem.
///
/// Owns the registry of watched paths, the event queue and the active set of
/// workers. The host constructs it, calls [`FileWatch::init`], registers
/// paths, starts watching, and calls [`FileWatch::drain`] at its own cadence.
pub struct FileWatch {
    config: WatchConfig,
    backend: Box<dyn WatchBackend>,
    registry: WatchRegistry,
    queue: Option<Arc<EventQueue>>,
    watchers: Vec<WatcherWorker>,
    next_worker_id: usize,
    shut_down: bool,
}

impl FileWatch {
    /// Create a subsystem backed by the platform's `notify` watcher.
    pub fn new(config: WatchConfig) -> Self {
        Self::with_backend(config, NotifyBackend::new())
    }

    /// Create a subsystem with a custom platform backend.
    pub fn with_backend(config: WatchConfig, backend: impl WatchBackend + 'static) -> Self {
        let mut registry = WatchRegistry::new();
        for path in &config.paths {
            registry.register(path.clone());
        }

        Self {
            config,
            backend: Box::new(backend),
            registry,
            queue: None,
            watchers: Vec::new(),
            next_worker_id: 0,
            shut_down: false,
        }
    }

    /// Create the event queue. Must run before [`FileWatch::start`].
    ///
    /// Returns `false` when watching is disabled, the config is invalid, or
    /// the subsystem was shut down.
    pub fn init(&mut self) -> bool {
        if self.shut_down {
            return false;
        }
        if !self.config.enabled {
            info!("File watch disabled");
            return false;
        }
        if let Err(e) = self.config.validate() {
            error!("File watch init failed: {e}");
            return false;
        }

        if self.queue.is_none() {
            self.queue = Some(Arc::new(EventQueue::new()));
            info!("Initialized file watch");
        }
        true
    }

    /// Add a directory to the registry. Only valid while stopped.
    pub fn register_path(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        self.ensure_stopped(&path)?;

        debug!("Registered {}", path.display());
        self.registry.register(path);
        Ok(())
    }

    /// Remove every registry entry equal to `path`. Only valid while stopped.
    pub fn unregister_path(&mut self, path: &Path) -> Result<usize> {
        self.ensure_stopped(path)?;
        Ok(self.registry.unregister(path))
    }

    fn ensure_stopped(&self, path: &Path) -> Result<()> {
        if self.shut_down {
            return Err(WatchError::ShutDown);
        }
        if !self.watchers.is_empty() {
            return Err(WatchError::AlreadyWatching(path.display().to_string()));
        }
        Ok(())
    }

    /// Spawn one worker per registered path.
    ///
    /// Paths whose handle cannot be acquired are logged and skipped; they
    /// produce no events until the next start or refresh.
    pub fn start(&mut self) -> Result<()> {
        if self.shut_down {
            return Err(WatchError::ShutDown);
        }
        if !self.config.enabled {
            return Ok(());
        }
        let Some(queue) = self.queue.clone() else {
            return Err(WatchError::NotInitialized);
        };
        if self.registry.is_empty() {
            return Ok(());
        }
        if !self.watchers.is_empty() {
            debug!("File watch already started");
            return Ok(());
        }

        for path in self.registry.paths() {
            let handle = match self.backend.open_watch(path) {
                Ok(handle) => handle,
                Err(e) => {
                    warn!("Skipping watch on {}: {e}", path.display());
                    continue;
                }
            };

            let mut worker = WatcherWorker::new(path.clone(), handle);
            let id = self.next_worker_id;
            self.next_worker_id += 1;

            match worker.start(id, self.config.buffer_size, Arc::clone(&queue)) {
                Ok(()) => self.watchers.push(worker),
                Err(e) => warn!("Failed to spawn watcher for {}: {e}", path.display()),
            }
        }

        info!(
            "File watch started: {} of {} paths",
            self.watchers.len(),
            self.registry.len()
        );
        Ok(())
    }

    /// Stop and join every worker, then clear the active set.
    pub fn stop(&mut self) {
        if self.watchers.is_empty() {
            return;
        }

        for worker in &mut self.watchers {
            worker.stop();
        }
        self.watchers.clear();

        info!("File watch stopped");
    }

    /// Stop, then start again with the current registry.
    pub fn refresh(&mut self) -> Result<()> {
        self.stop();
        self.start()
    }

    /// Stop watching and tear the subsystem down.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.stop();
        self.shut_down = true;
        info!("File watch shut down");
    }

    /// Dispatch the events queued so far to `sink`, returning how many were
    /// dispatched. Never blocks waiting for new events.
    pub fn drain<S>(&self, sink: &mut S) -> usize
    where
        S: EventSink + ?Sized,
    {
        self.dispatcher()
            .map_or(0, |dispatcher| dispatcher.drain(sink))
    }

    /// A cloneable drain handle, available after [`FileWatch::init`].
    pub fn dispatcher(&self) -> Option<Dispatcher> {
        self.queue.as_ref().map(|q| Dispatcher::new(Arc::clone(q)))
    }

    pub fn is_initialized(&self) -> bool {
        self.queue.is_some()
    }

    /// Whether any worker is active.
    pub fn is_running(&self) -> bool {
        !self.watchers.is_empty()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Number of active workers.
    pub fn active_workers(&self) -> usize {
        self.watchers.len()
    }

    /// Registered paths in insertion order.
    pub fn watched_paths(&self) -> &[PathBuf] {
        self.registry.paths()
    }

    /// Roots of the active workers.
    pub fn active_paths(&self) -> Vec<PathBuf> {
        self.watchers
            .iter()
            .filter(|w| w.state() == WorkerState::Running)
            .map(|w| w.path().to_path_buf())
            .collect()
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Snapshot of the subsystem.
    pub fn stats(&self) -> WatcherStats {
        WatcherStats {
            registered_paths: self.registry.len(),
            active_workers: self.watchers.len(),
            pending_events: self.queue.as_ref().map_or(0, |q| q.len()),
        }
    }
}

impl Drop for FileWatch {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Statistics about the file watch subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherStats {
    /// Paths in the registry.
    pub registered_paths: usize,

    /// Workers currently running.
    pub active_workers: usize,

    /// Events waiting to be drained.
    pub pending_events: usize,
}
