//! Cross-thread FIFO carrying events from workers to the consumer.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::event::FileEvent;

/// Unbounded, thread-safe FIFO of pending [`FileEvent`]s.
///
/// Any number of workers push; the application thread pops. The lock is held
/// only for the duration of a single push or pop.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Mutex<VecDeque<FileEvent>>,
}

impl EventQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event at the tail.
    pub fn push(&self, event: FileEvent) {
        self.events.lock().push_back(event);
    }

    /// Remove the head, or `None` when empty.
    pub fn pop(&self) -> Option<FileEvent> {
        self.events.lock().pop_front()
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}
