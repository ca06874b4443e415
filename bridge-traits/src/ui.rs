//! UI Thread Hand-Off
//!
//! The UI runs single-threaded; background tasks never touch it directly.
//! Completions and events reach it as boxed continuations posted through
//! [`UiEventSink`], which the host's UI loop drains on its own thread.

/// A continuation to run on the UI thread.
pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

/// Thread-safe hand-off to the single UI thread.
///
/// `post` may be called from any task. The host guarantees every accepted
/// task is invoked exactly once, on the UI thread, in posting order.
pub trait UiEventSink: Send + Sync {
    /// Queue a continuation for the UI thread.
    ///
    /// Returns `false` if the UI loop has shut down and the task was
    /// dropped. Callers treat that as a benign race during teardown.
    fn post(&self, task: UiTask) -> bool;
}
