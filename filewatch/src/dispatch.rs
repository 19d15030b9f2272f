//! Consumer side: draining the queue into the host's event sink.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::event::FileEvent;
use crate::queue::EventQueue;

/// Receives dispatched events on the draining thread.
pub trait EventSink {
    fn on_file_event(&mut self, event: FileEvent);
}

impl<F> EventSink for F
where
    F: FnMut(FileEvent),
{
    fn on_file_event(&mut self, event: FileEvent) {
        self(event)
    }
}

/// Drains an [`EventQueue`] into an [`EventSink`].
#[derive(Debug, Clone)]
pub struct Dispatcher {
    queue: Arc<EventQueue>,
}

impl Dispatcher {
    pub fn new(queue: Arc<EventQueue>) -> Self {
        Self { queue }
    }

    /// Forward the events queued at the time of the call, oldest first.
    ///
    /// Never blocks waiting for new events. Events pushed while draining may
    /// or may not be included. Returns the number of events dispatched.
    pub fn drain<S>(&self, sink: &mut S) -> usize
    where
        S: EventSink + ?Sized,
    {
        let pending = self.queue.len();
        let mut dispatched = 0;
        while dispatched < pending {
            let Some(event) = self.queue.pop() else {
                break;
            };
            sink.on_file_event(event);
            dispatched += 1;
        }
        dispatched
    }

    /// Number of events waiting to be drained.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

/// Drains a [`Dispatcher`] on a fixed cadence from a tokio task.
pub struct DrainScheduler {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<usize>,
}

impl DrainScheduler {
    /// Spawn the drain loop on the current tokio runtime.
    pub fn spawn<S>(dispatcher: Dispatcher, period: Duration, mut sink: S) -> Self
    where
        S: EventSink + Send + 'static,
    {
        let (shutdown, mut stop_rx) = oneshot::channel();
        let period = period.max(Duration::from_millis(1));

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut total = 0;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        total += dispatcher.drain(&mut sink);
                    }
                    _ = &mut stop_rx => break,
                }
            }

            total += dispatcher.drain(&mut sink);
            debug!("Drain loop finished after {total} events");
            total
        });

        Self {
            shutdown: Some(shutdown),
            task,
        }
    }

    /// Stop the loop after one final drain. Returns the total dispatched.
    pub async fn stop(mut self) -> usize {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        match self.task.await {
            Ok(total) => total,
            Err(e) => {
                warn!("Drain loop failed: {e}");
                0
            }
        }
    }
}
