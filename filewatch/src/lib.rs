//! # File Watch
//!
//! Near-real-time create/modify/remove notifications for a set of watched
//! directories. The host registers directories once, starts watching, and
//! drains queued events on its own thread at its own cadence (for example
//! once per frame when live-reloading assets).
//!
//! ## Architecture
//!
//! ```text
//! WatchRegistry ──start──► WatcherWorker (one thread per path)
//!                               │  WatchHandle: request_read / wait / cancel
//!                               ▼
//!                          EventQueue ──drain──► Dispatcher ──► EventSink
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use filewatch::{FileEvent, FileWatch, WatchConfig};
//!
//! let mut watch = FileWatch::new(WatchConfig::new().with_path("assets"));
//! if watch.init() {
//!     watch.start()?;
//! }
//!
//! // Once per frame:
//! watch.drain(&mut |event: FileEvent| {
//!     println!("{} {}", event.kind, event.path.display());
//! });
//!
//! watch.shutdown();
//! # Ok::<(), filewatch::WatchError>(())
//! ```
//!
//! Renames arrive as a `Remove` of the old name and a `Create` of the new
//! one, with nothing tying the two together.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod platform;
pub mod queue;
pub mod record;
pub mod registry;
pub mod watcher;
mod worker;

pub use config::WatchConfig;
pub use dispatch::{Dispatcher, DrainScheduler, EventSink};
pub use error::{Result, WatchError};
pub use event::{FileEvent, FileEventKind};
pub use platform::{CancelHandle, Completion, NotifyBackend, WatchBackend, WatchHandle};
pub use queue::EventQueue;
pub use registry::WatchRegistry;
pub use watcher::{FileWatch, WatcherStats};
