//! # Request Executor
//!
//! Runs one logical remote call per background task, bounds it with a
//! timeout, and delivers the result back to the UI thread through the
//! host's [`UiEventSink`].
//!
//! ## Guarantees
//!
//! - The caller-supplied continuation runs **exactly once**, on the UI
//!   thread, whether the work succeeds, fails, times out, or panics. It is
//!   never invoked on the background task's own stack.
//! - A timed-out work task is aborted; nothing keeps running after its
//!   completion has been delivered.
//!
//! ## Two entry points
//!
//! [`RequestExecutor::dispatch`] is the fire-and-forget form used for
//! calls whose result the UI consumes. [`RequestExecutor::execute`] is the
//! awaitable form used *inside* background flows (token exchange/refresh),
//! where the caller is itself a background task that needs the value
//! inline.

use bridge_traits::ui::UiEventSink;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Errors produced by the executor itself, as opposed to errors returned
/// by the work closure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

/// Executes bounded background requests with UI-thread completion.
#[derive(Clone)]
pub struct RequestExecutor {
    ui_sink: Arc<dyn UiEventSink>,
}

impl RequestExecutor {
    pub fn new(ui_sink: Arc<dyn UiEventSink>) -> Self {
        Self { ui_sink }
    }

    /// Run `work` on a background task and hand the result to
    /// `on_complete` on the UI thread.
    ///
    /// The continuation receives `Err(ExecutorError::Timeout)` when `within`
    /// elapses first, and `Err(ExecutorError::TaskFailed)` if the work task
    /// panicked. In both cases the work task no longer runs.
    pub fn dispatch<T, F, C>(&self, within: Duration, work: F, on_complete: C)
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
        C: FnOnce(Result<T, ExecutorError>) + Send + 'static,
    {
        let ui_sink = Arc::clone(&self.ui_sink);

        // The work runs in its own task so a panic there surfaces as a
        // JoinError in the supervisor instead of killing the delivery path.
        let worker = tokio::spawn(work);
        let abort = worker.abort_handle();

        tokio::spawn(async move {
            let result = match timeout(within, worker).await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(join_err)) => {
                    warn!(error = %join_err, "Background request task failed");
                    Err(ExecutorError::TaskFailed(join_err.to_string()))
                }
                Err(_) => {
                    abort.abort();
                    debug!(timeout = ?within, "Background request timed out");
                    Err(ExecutorError::Timeout(within))
                }
            };

            let delivered = ui_sink.post(Box::new(move || on_complete(result)));
            if !delivered {
                debug!("Completion dropped: UI queue has shut down");
            }
        });
    }

    /// Run `work` on a background task and await its result, bounded by
    /// `within`.
    ///
    /// Blocks only the calling background task, never the UI thread. On
    /// timeout the work task is aborted and does not leak.
    pub async fn execute<T, F>(&self, within: Duration, work: F) -> Result<T, ExecutorError>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        let worker = tokio::spawn(work);
        let abort = worker.abort_handle();

        match timeout(within, worker).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(join_err)) => {
                warn!(error = %join_err, "Background request task failed");
                Err(ExecutorError::TaskFailed(join_err.to_string()))
            }
            Err(_) => {
                abort.abort();
                Err(ExecutorError::Timeout(within))
            }
        }
    }
}
