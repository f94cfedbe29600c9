//! Keep-polling decision.
//!
//! Evaluated fresh on every successfully fetched snapshot. The pipeline is
//! considered quiescent, and polling can stop, when any of these holds:
//!
//! 1. the terminal gate step is `Incomplete` (it needs user action),
//! 2. every step is `Completed`,
//! 3. every step except the trailing steps is `Completed` and all trailing
//!    steps are `NotStarted`.
//!
//! Any other snapshot means the backend may still change state.

use std::time::Duration;

use serde::Serialize;

use crate::status::{StatusMap, StepState};
use crate::step::StepKey;

/// Default refetch interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Parameters of the stop conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingPolicy {
    /// Delay between refetches while polling.
    pub interval: Duration,
    /// Step whose `Incomplete` state means the pipeline waits on the user.
    pub terminal_gate: StepKey,
    /// Optional last-in-pipeline steps that may legitimately stay unstarted.
    pub trailing_steps: Vec<StepKey>,
}

impl Default for PollingPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            terminal_gate: StepKey::PromptGenerator,
            trailing_steps: vec![StepKey::ProcessImages, StepKey::ProcessScenesAndShots],
        }
    }
}

/// Why polling stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdleReason {
    TerminalGateIncomplete,
    AllCompleted,
    OnlyTrailingStepsRemain,
}

impl IdleReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TerminalGateIncomplete => "terminal_gate_incomplete",
            Self::AllCompleted => "all_completed",
            Self::OnlyTrailingStepsRemain => "only_trailing_steps_remain",
        }
    }
}

/// Outcome of evaluating one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDecision {
    Poll,
    Idle(IdleReason),
}

impl PollDecision {
    pub fn keeps_polling(&self) -> bool {
        matches!(self, Self::Poll)
    }
}

/// Decide whether to keep refetching after receiving `statuses`.
///
/// An empty snapshot keeps polling: the backend has not reported any
/// steps yet. Steps are matched by key, so legacy aliases should be
/// re-keyed with [`canonical_keys`](crate::normalize::canonical_keys)
/// first.
pub fn evaluate(statuses: &StatusMap, policy: &PollingPolicy) -> PollDecision {
    if statuses.is_empty() {
        return PollDecision::Poll;
    }

    let gate_incomplete = statuses
        .get(&policy.terminal_gate)
        .is_some_and(|s| s.state == StepState::Incomplete);
    if gate_incomplete {
        return PollDecision::Idle(IdleReason::TerminalGateIncomplete);
    }

    if statuses.values().all(|s| s.state.is_completed()) {
        return PollDecision::Idle(IdleReason::AllCompleted);
    }

    let others_completed = statuses
        .iter()
        .filter(|(key, _)| !policy.trailing_steps.contains(key))
        .all(|(_, s)| s.state.is_completed());
    let trailing_unstarted = policy.trailing_steps.iter().all(|key| {
        statuses
            .get(key)
            .is_some_and(|s| s.state == StepState::NotStarted)
    });
    if others_completed && trailing_unstarted {
        return PollDecision::Idle(IdleReason::OnlyTrailingStepsRemain);
    }

    PollDecision::Poll
}

/// Boolean form of [`evaluate`].
pub fn should_keep_polling(statuses: &StatusMap, policy: &PollingPolicy) -> bool {
    evaluate(statuses, policy).keeps_polling()
}
