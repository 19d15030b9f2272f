//! Watcher worker: one thread per watched path.
//!
//! The thread owns the platform handle and the notification buffer. The
//! controller keeps only the running flag, a cancel handle and the join
//! handle, and stops a worker by clearing the flag, cancelling the pending
//! read and then joining. Joining without the cancel can block forever on a
//! quiet directory.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use tracing::{debug, trace, warn};

use crate::event::{FileEvent, FileEventKind};
use crate::platform::{CancelHandle, Completion, WatchHandle};
use crate::queue::EventQueue;
use crate::record::records;

/// Lifecycle of a [`WatcherWorker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerState {
    /// Handle acquired, thread not spawned yet.
    Idle,
    /// Thread is running the read loop.
    Running,
    /// Running flag cleared and read cancelled; join in progress.
    Stopping,
    /// Thread joined; handle and buffer released.
    Stopped,
}

pub(crate) struct WatcherWorker {
    path: PathBuf,
    running: Arc<AtomicBool>,
    cancel: Box<dyn CancelHandle>,
    handle: Option<Box<dyn WatchHandle>>,
    thread: Option<JoinHandle<()>>,
    state: WorkerState,
}

impl WatcherWorker {
    pub(crate) fn new(path: PathBuf, handle: Box<dyn WatchHandle>) -> Self {
        Self {
            path,
            running: Arc::new(AtomicBool::new(false)),
            cancel: handle.cancel_handle(),
            handle: Some(handle),
            thread: None,
            state: WorkerState::Idle,
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn state(&self) -> WorkerState {
        self.state
    }

    /// Spawn the worker thread. On failure the handle is released.
    pub(crate) fn start(
        &mut self,
        id: usize,
        buffer_size: usize,
        queue: Arc<EventQueue>,
    ) -> io::Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        self.running.store(true, Ordering::Release);
        let worker_loop = WorkerLoop {
            root: self.path.clone(),
            handle,
            buffer: vec![0; buffer_size],
            running: Arc::clone(&self.running),
            queue,
        };

        match thread::Builder::new()
            .name(format!("filewatch-{id}"))
            .spawn(move || worker_loop.run())
        {
            Ok(thread) => {
                self.thread = Some(thread);
                self.state = WorkerState::Running;
                debug!("Watching {}", self.path.display());
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::Release);
                self.state = WorkerState::Stopped;
                Err(e)
            }
        }
    }

    /// Clear the running flag, cancel the pending read, then join.
    pub(crate) fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            self.handle = None;
            self.state = WorkerState::Stopped;
            return;
        };

        self.state = WorkerState::Stopping;
        self.running.store(false, Ordering::Release);
        self.cancel.cancel();

        if thread.join().is_err() {
            warn!("Watcher thread for {} panicked", self.path.display());
        }
        self.state = WorkerState::Stopped;
        debug!("Stopped watching {}", self.path.display());
    }
}

impl Drop for WatcherWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

struct WorkerLoop {
    root: PathBuf,
    handle: Box<dyn WatchHandle>,
    buffer: Vec<u8>,
    running: Arc<AtomicBool>,
    queue: Arc<EventQueue>,
}

impl WorkerLoop {
    fn run(mut self) {
        while self.running.load(Ordering::Acquire) {
            if let Err(e) = self.handle.request_read() {
                warn!("Read request failed for {}: {e}", self.root.display());
                break;
            }

            match self.handle.wait(&mut self.buffer) {
                Completion::Cancelled => break,
                Completion::Completed(_) if !self.running.load(Ordering::Acquire) => break,
                Completion::Completed(len) => self.publish(len),
            }
        }

        trace!("Worker loop for {} exited", self.root.display());
    }

    fn publish(&self, len: usize) {
        let filled = &self.buffer[..len.min(self.buffer.len())];
        for record in records(filled) {
            let kind = FileEventKind::from(record.action);
            if kind == FileEventKind::Unknown {
                trace!("Dropping record with action {:?}", record.action);
                continue;
            }
            let path = self.root.join(record.name.as_ref());
            self.queue.push(FileEvent::new(kind, path));
        }
    }
}
