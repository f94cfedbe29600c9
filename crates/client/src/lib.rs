//! Status polling client.
//!
//! Fetches analysis status snapshots over REST, retries transient
//! failures with capped exponential backoff, and drives the keep-polling
//! decision from `reel-core` through an injectable [`Scheduler`].
//!
//! [`Scheduler`]: scheduler::Scheduler

pub mod api;
pub mod poller;
pub mod retry;
pub mod scheduler;

pub use api::{StatusApi, StatusApiError, StatusSource, StatusTarget};
pub use poller::{PollMode, PollerHandle, PollerState, StatusPoller};
pub use scheduler::{ScheduledHandle, Scheduler, TokioScheduler};
