//! Platform watch adapter.
//!
//! Workers only talk to the operating system through these traits: open a
//! handle for a directory, arm a read, block until it completes or is
//! cancelled, and drop the handle to release it. Completed reads leave
//! packed [`crate::record`] entries in the worker's buffer.

pub mod notify_backend;

use std::io;
use std::path::Path;

use crate::error::Result;

pub use notify_backend::NotifyBackend;

/// Outcome of waiting on a pending read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The read finished; this many bytes of the buffer hold records.
    Completed(usize),
    /// The read was cancelled through a [`CancelHandle`].
    Cancelled,
}

/// Opens watch handles. One implementation per target platform.
pub trait WatchBackend: Send + Sync {
    /// Acquire a handle watching `path` and its subtree for name, creation
    /// and last-write changes.
    fn open_watch(&self, path: &Path) -> Result<Box<dyn WatchHandle>>;
}

/// An open watch on one directory. Dropping it closes the handle.
pub trait WatchHandle: Send {
    /// A handle that can cancel this watch's pending read from any thread.
    fn cancel_handle(&self) -> Box<dyn CancelHandle>;

    /// Issue one asynchronous fill of the notification buffer.
    fn request_read(&mut self) -> io::Result<()>;

    /// Block until the requested read completes, writing records into
    /// `buffer`, or until it is cancelled.
    fn wait(&mut self, buffer: &mut [u8]) -> Completion;
}

/// Forces a pending (or the next) wait to return [`Completion::Cancelled`].
pub trait CancelHandle: Send + Sync {
    fn cancel(&self);
}
