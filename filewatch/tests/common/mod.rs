//! Shared test support: a scripted platform backend and drain helpers.

#![allow(dead_code)]

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use filewatch::record::{Action, RecordWriter};
use filewatch::{
    CancelHandle, Completion, FileEvent, FileWatch, WatchBackend, WatchError, WatchHandle,
};
use parking_lot::Mutex;

type Batch = Vec<(Action, String)>;

#[derive(Default)]
struct Inner {
    opened: AtomicUsize,
    closed: AtomicUsize,
    unavailable: Mutex<HashSet<PathBuf>>,
    failing_requests: Mutex<HashSet<PathBuf>>,
    feeds: Mutex<Vec<(PathBuf, Sender<Option<Batch>>)>>,
}

/// Backend whose handles complete only when the test feeds them records.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    inner: Arc<Inner>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `open_watch` fail for `path`.
    pub fn fail_on(&self, path: impl Into<PathBuf>) {
        self.inner.unavailable.lock().insert(path.into());
    }

    /// Make every `request_read` on handles for `path` fail.
    pub fn fail_request_on(&self, path: impl Into<PathBuf>) {
        self.inner.failing_requests.lock().insert(path.into());
    }

    pub fn opened(&self) -> usize {
        self.inner.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Complete one read on every open handle for `root` with `records`.
    /// Returns how many handles received them.
    pub fn emit(&self, root: impl AsRef<Path>, records: &[(Action, &str)]) -> usize {
        let root = root.as_ref();
        let batch: Batch = records
            .iter()
            .map(|(action, name)| (*action, (*name).to_string()))
            .collect();

        let mut delivered = 0;
        self.inner.feeds.lock().retain(|(path, tx)| {
            if path != root {
                return true;
            }
            match tx.send(Some(batch.clone())) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                // The handle was closed.
                Err(_) => false,
            }
        });
        delivered
    }
}

impl WatchBackend for ScriptedBackend {
    fn open_watch(&self, path: &Path) -> filewatch::Result<Box<dyn WatchHandle>> {
        if self.inner.unavailable.lock().contains(path) {
            return Err(WatchError::ResourceUnavailable {
                path: path.to_path_buf(),
                reason: "scripted failure".to_string(),
            });
        }

        let (tx, rx) = crossbeam_channel::unbounded();
        self.inner
            .feeds
            .lock()
            .push((path.to_path_buf(), tx.clone()));
        self.inner.opened.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(ScriptedHandle {
            rx,
            tx,
            fail_request: self.inner.failing_requests.lock().contains(path),
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct ScriptedHandle {
    rx: Receiver<Option<Batch>>,
    tx: Sender<Option<Batch>>,
    fail_request: bool,
    inner: Arc<Inner>,
}

struct ScriptedCancel(Sender<Option<Batch>>);

impl CancelHandle for ScriptedCancel {
    fn cancel(&self) {
        let _ = self.0.send(None);
    }
}

impl WatchHandle for ScriptedHandle {
    fn cancel_handle(&self) -> Box<dyn CancelHandle> {
        Box::new(ScriptedCancel(self.tx.clone()))
    }

    fn request_read(&mut self) -> io::Result<()> {
        if self.fail_request {
            return Err(io::Error::other("scripted read failure"));
        }
        Ok(())
    }

    fn wait(&mut self, buffer: &mut [u8]) -> Completion {
        match self.rx.recv() {
            Ok(Some(batch)) => {
                let mut writer = RecordWriter::new(buffer);
                for (action, name) in &batch {
                    writer.push(*action, name);
                }
                Completion::Completed(writer.finish())
            }
            Ok(None) | Err(_) => Completion::Cancelled,
        }
    }
}

impl Drop for ScriptedHandle {
    fn drop(&mut self) {
        self.inner.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Drain `watch` until `done` accepts the collected events or `timeout`
/// passes. Returns everything collected.
pub fn drain_until(
    watch: &FileWatch,
    timeout: Duration,
    mut done: impl FnMut(&[FileEvent]) -> bool,
) -> Vec<FileEvent> {
    let deadline = Instant::now() + timeout;
    let mut events = Vec::new();
    loop {
        watch.drain(&mut |event: FileEvent| events.push(event));
        if done(&events) || Instant::now() >= deadline {
            return events;
        }
        thread::sleep(Duration::from_millis(10));
    }
}

/// Drain until at least `count` events arrived.
pub fn drain_count(watch: &FileWatch, count: usize) -> Vec<FileEvent> {
    drain_until(watch, Duration::from_secs(5), |events| events.len() >= count)
}

/// Run `f` on another thread and report whether it finished within `limit`.
pub fn finishes_within<F>(limit: Duration, f: F) -> bool
where
    F: FnOnce() + Send + 'static,
{
    let (tx, rx) = crossbeam_channel::bounded(1);
    thread::spawn(move || {
        f();
        let _ = tx.send(());
    });
    rx.recv_timeout(limit).is_ok()
}
