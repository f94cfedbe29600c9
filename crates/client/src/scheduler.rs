//! Delayed-task scheduling capability.
//!
//! The poller never touches a timer API directly; it asks a [`Scheduler`]
//! to run a task after a delay and keeps the returned
//! [`ScheduledHandle`]. Cancelling or dropping the handle guarantees the
//! task will not run afterwards.

use std::time::Duration;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

/// A unit of work to run once the delay elapses.
pub type ScheduledTask = BoxFuture<'static, ()>;

/// Runs a task after a delay.
pub trait Scheduler: Send + Sync + 'static {
    fn schedule(&self, delay: Duration, task: ScheduledTask) -> ScheduledHandle;
}

/// Cancellation handle for one scheduled task.
///
/// Dropping the handle cancels the task.
#[derive(Debug)]
pub struct ScheduledHandle {
    cancel: CancellationToken,
}

impl ScheduledHandle {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for ScheduledHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// [`Scheduler`] backed by `tokio::time::sleep` on the current runtime.
#[derive(Debug, Clone, Default)]
pub struct TokioScheduler;

impl TokioScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: ScheduledTask) -> ScheduledHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => task.await,
            }
        });

        ScheduledHandle::new(cancel)
    }
}
