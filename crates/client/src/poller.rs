//! Status polling controller.
//!
//! [`StatusPoller::spawn`] starts an actor task that fetches the status
//! snapshot, builds the [`AnalysisView`], and asks the injected
//! [`Scheduler`] for the next tick only while the view's decision is
//! [`PollDecision::Poll`]. State is published on a
//! [`tokio::sync::watch`] channel; commands (manual refresh, dismissing
//! the error banner) arrive over an mpsc channel.
//!
//! Every fetch invalidates all outstanding ticks, and a refresh requested
//! while a fetch is in flight is satisfied by that fetch, so overlapping
//! triggers never produce a duplicate fetch. The latest received snapshot
//! always wins.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reel_core::polling::{IdleReason, PollDecision};
use reel_core::view::AnalysisView;
use reel_core::{StatusSnapshot, StepCatalog};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::{StatusSource, StatusTarget};
use crate::retry::{fetch_with_retry, RetryConfig};
use crate::scheduler::{ScheduledHandle, Scheduler, TokioScheduler};

/// Capacity of the command channel.
const COMMAND_CHANNEL_CAPACITY: usize = 16;

// ---------------------------------------------------------------------------
// Published state
// ---------------------------------------------------------------------------

/// Whether the poller is refetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    Polling,
    Idle(IdleReason),
    /// The poller task has exited.
    Stopped,
}

impl From<PollDecision> for PollMode {
    fn from(decision: PollDecision) -> Self {
        match decision {
            PollDecision::Poll => Self::Polling,
            PollDecision::Idle(reason) => Self::Idle(reason),
        }
    }
}

/// Snapshot of the poller as seen by observers.
#[derive(Debug, Clone)]
pub struct PollerState {
    /// Last successfully fetched snapshot. Kept across failed fetches.
    pub snapshot: Option<Arc<StatusSnapshot>>,
    /// View built from `snapshot`.
    pub view: Option<Arc<AnalysisView>>,
    /// Error of the last fetch, until a fetch succeeds or it is dismissed.
    pub last_error: Option<String>,
    pub mode: PollMode,
    pub fetched_at: Option<DateTime<Utc>>,
    /// Successful fetches so far.
    pub fetch_count: u64,
    /// Fetch cycles that failed after exhausting retries.
    pub error_count: u64,
}

impl Default for PollerState {
    fn default() -> Self {
        Self {
            snapshot: None,
            view: None,
            last_error: None,
            mode: PollMode::Polling,
            fetched_at: None,
            fetch_count: 0,
            error_count: 0,
        }
    }
}

#[derive(Debug)]
enum Command {
    /// Manual refresh, tagged with the number of fetches finished when it
    /// was requested.
    Refresh(u64),
    /// Scheduled refetch, tagged with the generation it was armed in.
    Tick(u64),
    DismissError,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures and starts a poller for one target.
pub struct StatusPoller {
    source: Arc<dyn StatusSource>,
    scheduler: Arc<dyn Scheduler>,
    catalog: Arc<StepCatalog>,
    target: StatusTarget,
    retry: RetryConfig,
}

impl StatusPoller {
    pub fn new(source: Arc<dyn StatusSource>, target: StatusTarget, catalog: StepCatalog) -> Self {
        Self {
            source,
            scheduler: Arc::new(TokioScheduler::new()),
            catalog: Arc::new(catalog),
            target,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Start the poller task. Must be called within a Tokio runtime.
    ///
    /// The first fetch starts immediately.
    pub fn spawn(self) -> PollerHandle {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(PollerState::default());
        let cancel = CancellationToken::new();
        let fetches_done = Arc::new(AtomicU64::new(0));

        let actor = PollerActor {
            config: self,
            commands: command_rx,
            ticks: command_tx.clone(),
            state: state_tx,
            cancel: cancel.clone(),
            generation: 0,
            pending: None,
            fetches_done: fetches_done.clone(),
        };
        let task = tokio::spawn(actor.run());

        PollerHandle {
            commands: command_tx,
            state: state_rx,
            cancel,
            fetches_done,
            task: Some(task),
        }
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Control handle for a running poller.
///
/// Dropping the handle stops the poller; [`PollerHandle::shutdown`] also
/// waits for the task to exit.
pub struct PollerHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<PollerState>,
    cancel: CancellationToken,
    fetches_done: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Fetch now and re-arm polling, even while idle.
    ///
    /// Returns `false` if the poller has stopped or is saturated.
    pub fn refresh(&self) -> bool {
        self.send(Command::Refresh(self.fetches_done.load(Ordering::Acquire)))
    }

    /// Clear the last error without waiting for a successful fetch.
    pub fn dismiss_error(&self) -> bool {
        self.send(Command::DismissError)
    }

    /// Current state.
    pub fn state(&self) -> PollerState {
        self.state.borrow().clone()
    }

    /// A receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<PollerState> {
        self.state.clone()
    }

    /// Stop polling and wait for the task to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Status poller task failed");
            }
        }
    }

    fn send(&self, command: Command) -> bool {
        match self.commands.try_send(command) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Poller command not delivered");
                false
            }
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

struct PollerActor {
    config: StatusPoller,
    commands: mpsc::Receiver<Command>,
    /// Sender cloned into scheduled tick tasks.
    ticks: mpsc::Sender<Command>,
    state: watch::Sender<PollerState>,
    cancel: CancellationToken,
    /// Incremented on every fetch; ticks from older generations are stale.
    generation: u64,
    pending: Option<ScheduledHandle>,
    /// Fetches finished, successful or not. Shared with the handle.
    fetches_done: Arc<AtomicU64>,
}

impl PollerActor {
    async fn run(mut self) {
        tracing::info!(
            script_id = %self.config.target.script_id,
            version_id = %self.config.target.version_id,
            interval_ms = self.config.catalog.polling.interval.as_millis() as u64,
            "Status poller started",
        );

        self.fetch().await;

        loop {
            let command = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                command = self.commands.recv() => command,
            };

            match command {
                Some(Command::Refresh(seen))
                    if seen < self.fetches_done.load(Ordering::Acquire) =>
                {
                    tracing::debug!("Refresh already satisfied by an in-flight fetch");
                }
                Some(Command::Refresh(_)) => {
                    tracing::debug!("Manual status refresh");
                    self.fetch().await;
                }
                Some(Command::Tick(generation)) if generation == self.generation => {
                    self.fetch().await;
                }
                Some(Command::Tick(generation)) => {
                    tracing::trace!(generation, current = self.generation, "Ignoring stale tick");
                }
                Some(Command::DismissError) => {
                    self.state.send_modify(|s| s.last_error = None);
                }
                None => break,
            }
        }

        self.pending = None;
        self.state.send_modify(|s| s.mode = PollMode::Stopped);
        tracing::info!("Status poller stopped");
    }

    async fn fetch(&mut self) {
        self.generation += 1;
        self.pending = None;

        let result = fetch_with_retry(
            self.config.source.as_ref(),
            &self.config.target,
            &self.config.retry,
            &self.cancel,
        )
        .await;

        let Some(result) = result else {
            return;
        };
        self.fetches_done.fetch_add(1, Ordering::AcqRel);

        match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                let view = Arc::new(AnalysisView::build(&snapshot, &self.config.catalog));
                let decision = view.decision;

                tracing::debug!(
                    steps = snapshot.len(),
                    overall_pct = view.overall_progress,
                    "Status snapshot received",
                );

                self.state.send_modify(|s| {
                    s.snapshot = Some(snapshot);
                    s.view = Some(view);
                    s.last_error = None;
                    s.mode = decision.into();
                    s.fetched_at = Some(Utc::now());
                    s.fetch_count += 1;
                });

                match decision {
                    PollDecision::Poll => self.schedule_tick(),
                    PollDecision::Idle(reason) => {
                        tracing::info!(reason = reason.as_str(), "Pipeline quiescent, polling paused");
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Status fetch failed, keeping last snapshot");
                self.state.send_modify(|s| {
                    s.last_error = Some(e.to_string());
                    s.mode = PollMode::Polling;
                    s.error_count += 1;
                });
                self.schedule_tick();
            }
        }
    }

    fn schedule_tick(&mut self) {
        let generation = self.generation;
        let ticks = self.ticks.clone();
        let handle = self.config.scheduler.schedule(
            self.config.catalog.polling.interval,
            Box::pin(async move {
                // Fails only once the poller has exited.
                let _ = ticks.send(Command::Tick(generation)).await;
            }),
        );
        self.pending = Some(handle);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
