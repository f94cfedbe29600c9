//! Log output for poller state changes.

use reel_client::{PollMode, PollerState};
use reel_core::progress::round_percent;
use reel_core::status::StepDetail;
use reel_core::view::{AnalysisView, StepRow, ViewSummary};

/// One human-readable line per step.
pub fn describe_row(row: &StepRow) -> String {
    let mut line = format!("{} [{}]", row.title, row.state.as_str());

    if let Some(pct) = row.progress {
        line.push_str(&format!(" {}%", round_percent(pct)));
    }
    if let StepDetail::Entities(entities) = &row.detail {
        let done = entities.iter().filter(|e| e.status.is_completed()).count();
        line.push_str(&format!(" {done}/{} entities", entities.len()));
    }
    if row.detail == StepDetail::Unrecognized {
        line.push_str(" (details not recognized)");
    }
    if let Some(credits) = row.credits_used {
        line.push_str(&format!(" credits={credits}"));
    }
    if !row.blocked_by.is_empty() {
        let names: Vec<&str> = row.blocked_by.iter().map(|k| k.as_str()).collect();
        line.push_str(&format!(" waiting on {}", names.join(", ")));
    }

    line
}

/// Log the whole view at info level.
pub fn log_view(view: &AnalysisView) {
    let summary = ViewSummary::from(view);
    let summary_json = serde_json::to_string(&summary).unwrap_or_default();

    tracing::info!(
        overall_pct = summary.overall_pct,
        completed = summary.completed,
        total = summary.total,
        total_credits = view.total_credits,
        summary = %summary_json,
        "Analysis progress",
    );

    for row in view.visible_rows() {
        tracing::info!(step = %row.key, "{}", describe_row(row));
    }
}

/// Log a state change.
pub fn log_state(state: &PollerState) {
    if let Some(error) = &state.last_error {
        tracing::warn!(error = %error, errors = state.error_count, "Status refresh failing");
    }

    if let Some(view) = &state.view {
        log_view(view);
    }

    match state.mode {
        PollMode::Polling => tracing::debug!("Polling"),
        PollMode::Idle(reason) => tracing::info!(reason = reason.as_str(), "Poller idle"),
        PollMode::Stopped => tracing::info!("Poller stopped"),
    }
}
