//! UI Thread Hand-Off Queue
//!
//! Channel-backed implementation of [`UiEventSink`]. Background tasks post
//! boxed continuations from any thread; the host's UI loop owns the
//! [`UiTaskQueue`] end and drains it between frames, so every continuation
//! runs on the UI thread.

use bridge_traits::ui::{UiEventSink, UiTask};
use tokio::sync::mpsc;
use tracing::debug;

/// Create a connected sink/queue pair.
///
/// The sink side is cheap to clone and share behind `Arc`; the queue side
/// belongs to the UI loop exclusively.
pub fn ui_channel() -> (ChannelEventSink, UiTaskQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelEventSink { tx }, UiTaskQueue { rx })
}

/// Sending half: implements [`UiEventSink`] over an unbounded channel.
#[derive(Clone)]
pub struct ChannelEventSink {
    tx: mpsc::UnboundedSender<UiTask>,
}

impl UiEventSink for ChannelEventSink {
    fn post(&self, task: UiTask) -> bool {
        match self.tx.send(task) {
            Ok(()) => true,
            Err(_) => {
                debug!("UI task dropped: queue receiver has shut down");
                false
            }
        }
    }
}

/// Receiving half, drained by the UI loop.
pub struct UiTaskQueue {
    rx: mpsc::UnboundedReceiver<UiTask>,
}

impl UiTaskQueue {
    /// Run every task currently queued, without blocking.
    ///
    /// Call once per UI frame. Returns the number of tasks executed.
    pub fn run_pending(&mut self) -> usize {
        let mut count = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            count += 1;
        }
        count
    }

    /// Await the next task and run it.
    ///
    /// Returns `false` once all sinks have been dropped. Useful for
    /// headless hosts and tests that park the "UI thread" on the queue.
    pub async fn run_next(&mut self) -> bool {
        match self.rx.recv().await {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }
}
