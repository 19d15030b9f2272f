//! Default backend built on the `notify` crate.
//!
//! `notify` keeps its OS watch armed continuously and delivers events on its
//! own thread. The handle forwards them over a channel and packs them into
//! the worker's buffer when the worker waits, so a cancel is just another
//! message on the same channel.

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use notify::event::{MetadataKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, trace, warn};

use super::{CancelHandle, Completion, WatchBackend, WatchHandle};
use crate::error::{Result, WatchError};
use crate::record::{Action, RecordWriter};

enum Signal {
    Event(notify::Result<Event>),
    Cancel,
}

/// Backend using the platform's recommended `notify` watcher.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotifyBackend;

impl NotifyBackend {
    pub fn new() -> Self {
        Self
    }
}

impl WatchBackend for NotifyBackend {
    fn open_watch(&self, path: &Path) -> Result<Box<dyn WatchHandle>> {
        Ok(Box::new(NotifyHandle::open(path)?))
    }
}

/// Recursive watch on one directory.
pub struct NotifyHandle {
    root: PathBuf,
    canonical_root: Option<PathBuf>,
    _watcher: RecommendedWatcher,
    signals: Receiver<Signal>,
    cancel_tx: Sender<Signal>,
    backlog: VecDeque<(Action, String)>,
    cancelled: bool,
}

impl NotifyHandle {
    /// Open a recursive watch on `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_dir() {
            return Err(WatchError::unavailable(path, "not a directory"));
        }

        let (tx, rx) = crossbeam_channel::unbounded();
        let event_tx = tx.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // The receiving handle may already be gone during teardown.
            let _ = event_tx.send(Signal::Event(res));
        })
        .map_err(|e| WatchError::unavailable(path, e))?;

        watcher
            .watch(path, RecursiveMode::Recursive)
            .map_err(|e| WatchError::unavailable(path, e))?;

        debug!("Opened watch handle for {}", path.display());

        Ok(Self {
            root: path.to_path_buf(),
            canonical_root: path.canonicalize().ok(),
            _watcher: watcher,
            signals: rx,
            cancel_tx: tx,
            backlog: VecDeque::new(),
            cancelled: false,
        })
    }

    fn absorb(&mut self, res: notify::Result<Event>) {
        let event = match res {
            Ok(event) => event,
            Err(e) => {
                warn!("Watch error under {}: {e}", self.root.display());
                return;
            }
        };

        for path in &event.paths {
            match classify(event.kind, path) {
                Some(action) => {
                    let name = self.relative_name(path);
                    self.backlog.push_back((action, name));
                }
                None => trace!("Ignoring {:?} for {}", event.kind, path.display()),
            }
        }
    }

    fn relative_name(&self, path: &Path) -> String {
        let relative = path
            .strip_prefix(&self.root)
            .ok()
            .or_else(|| {
                self.canonical_root
                    .as_deref()
                    .and_then(|root| path.strip_prefix(root).ok())
            })
            .unwrap_or(path);
        relative.to_string_lossy().into_owned()
    }
}

impl WatchHandle for NotifyHandle {
    fn cancel_handle(&self) -> Box<dyn CancelHandle> {
        Box::new(NotifyCancel {
            tx: self.cancel_tx.clone(),
        })
    }

    fn request_read(&mut self) -> io::Result<()> {
        // notify never disarms its watch, so there is nothing to issue.
        Ok(())
    }

    fn wait(&mut self, buffer: &mut [u8]) -> Completion {
        if std::mem::take(&mut self.cancelled) {
            return Completion::Cancelled;
        }

        while self.backlog.is_empty() {
            match self.signals.recv() {
                Ok(Signal::Event(res)) => self.absorb(res),
                Ok(Signal::Cancel) | Err(_) => return Completion::Cancelled,
            }
        }

        loop {
            match self.signals.try_recv() {
                Ok(Signal::Event(res)) => self.absorb(res),
                Ok(Signal::Cancel) => {
                    self.cancelled = true;
                    break;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }

        let capacity = buffer.len();
        let mut writer = RecordWriter::new(buffer);
        while let Some((action, name)) = self.backlog.front() {
            if writer.push(*action, name) {
                self.backlog.pop_front();
            } else if writer.is_empty() {
                warn!("Dropping notification for {name}: record exceeds the {capacity}-byte buffer");
                self.backlog.pop_front();
            } else {
                break;
            }
        }

        Completion::Completed(writer.finish())
    }
}

impl Drop for NotifyHandle {
    fn drop(&mut self) {
        debug!("Closed watch handle for {}", self.root.display());
    }
}

struct NotifyCancel {
    tx: Sender<Signal>,
}

impl CancelHandle for NotifyCancel {
    fn cancel(&self) {
        let _ = self.tx.send(Signal::Cancel);
    }
}

/// Map a notify event kind onto a record action, or `None` when the change is
/// outside the name/creation/last-write filter.
fn classify(kind: EventKind, path: &Path) -> Option<Action> {
    match kind {
        EventKind::Create(_) => Some(Action::Added),
        EventKind::Remove(_) => Some(Action::Removed),
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => Some(Action::RenamedOldName),
            RenameMode::To => Some(Action::RenamedNewName),
            // Reported in addition to the From/To halves.
            RenameMode::Both => None,
            RenameMode::Any | RenameMode::Other => Some(if path.exists() {
                Action::RenamedNewName
            } else {
                Action::RenamedOldName
            }),
        },
        EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)) => Some(Action::Modified),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(Action::Modified),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::records;
    use notify::event::{AccessKind, CreateKind, DataChange, RemoveKind};
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::thread;
    use tempfile::TempDir;

    fn decode(buf: &[u8]) -> Vec<(Action, String)> {
        records(buf)
            .map(|r| (r.action, r.name.into_owned()))
            .collect()
    }

    #[test]
    fn test_classify_event_kinds() {
        let path = Path::new("/nonexistent/file.txt");

        assert_eq!(
            classify(EventKind::Create(CreateKind::File), path),
            Some(Action::Added)
        );
        assert_eq!(
            classify(EventKind::Remove(RemoveKind::Any), path),
            Some(Action::Removed)
        );
        assert_eq!(
            classify(EventKind::Modify(ModifyKind::Data(DataChange::Content)), path),
            Some(Action::Modified)
        );
        assert_eq!(
            classify(EventKind::Modify(ModifyKind::Name(RenameMode::From)), path),
            Some(Action::RenamedOldName)
        );
        assert_eq!(
            classify(EventKind::Modify(ModifyKind::Name(RenameMode::To)), path),
            Some(Action::RenamedNewName)
        );
        assert_eq!(
            classify(EventKind::Modify(ModifyKind::Name(RenameMode::Both)), path),
            None
        );
        assert_eq!(
            classify(EventKind::Modify(ModifyKind::Name(RenameMode::Any)), path),
            Some(Action::RenamedOldName)
        );
        assert_eq!(
            classify(
                EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
                path
            ),
            None
        );
        assert_eq!(classify(EventKind::Access(AccessKind::Any), path), None);
    }

    #[test]
    fn test_open_rejects_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");

        let result = NotifyBackend::new().open_watch(&missing);
        assert!(matches!(
            result,
            Err(WatchError::ResourceUnavailable { .. })
        ));
    }

    #[test]
    fn test_open_rejects_plain_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file.txt");
        fs::write(&file, b"x").unwrap();

        assert!(NotifyBackend::new().open_watch(&file).is_err());
    }

    #[test]
    fn test_wait_reports_created_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut handle = NotifyHandle::open(temp_dir.path()).unwrap();

        fs::File::create(temp_dir.path().join("new.txt")).unwrap();

        let mut buffer = vec![0u8; 1024];
        handle.request_read().unwrap();
        let Completion::Completed(len) = handle.wait(&mut buffer) else {
            panic!("read was cancelled");
        };

        let decoded = decode(&buffer[..len]);
        assert_eq!(decoded.first(), Some(&(Action::Added, "new.txt".to_string())));
    }

    #[test]
    fn test_cancel_wakes_blocked_wait() {
        let temp_dir = TempDir::new().unwrap();
        let mut handle = NotifyHandle::open(temp_dir.path()).unwrap();
        let cancel = handle.cancel_handle();

        let waiter = thread::spawn(move || {
            let mut buffer = vec![0u8; 256];
            handle.request_read().unwrap();
            handle.wait(&mut buffer)
        });

        cancel.cancel();
        assert_eq!(waiter.join().unwrap(), Completion::Cancelled);
    }

    #[test]
    fn test_oversized_record_is_dropped() {
        let temp_dir = TempDir::new().unwrap();
        let mut handle = NotifyHandle::open(temp_dir.path()).unwrap();
        let mut buffer = vec![0u8; 48];

        fs::File::create(temp_dir.path().join("x".repeat(64))).unwrap();
        handle.request_read().unwrap();
        assert_eq!(handle.wait(&mut buffer), Completion::Completed(0));

        fs::File::create(temp_dir.path().join("ok")).unwrap();
        handle.request_read().unwrap();
        let Completion::Completed(len) = handle.wait(&mut buffer) else {
            panic!("read was cancelled");
        };
        assert_eq!(decode(&buffer[..len]), vec![(Action::Added, "ok".to_string())]);
    }
}
