//! Composed analysis view.
//!
//! Runs normalizer -> progress -> gate -> polling decision over one
//! snapshot and returns the rows a host renders. Built fresh for every
//! snapshot.

use serde::Serialize;

use crate::catalog::StepCatalog;
use crate::gate::{is_dependency_gated, missing_prerequisites, CompletionSets};
use crate::normalize::{canonical_keys, normalize};
use crate::polling::{evaluate, PollDecision};
use crate::progress::{overall_progress, scene_shot_progress};
use crate::status::{total_credits_used, StatusSnapshot, StepDetail, StepState};
use crate::step::StepKey;

/// One displayed step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRow {
    pub key: StepKey,
    pub title: String,
    pub state: StepState,
    /// Every prerequisite is at least `InProgress`.
    pub visible: bool,
    /// A prerequisite is not yet `Completed`, or the step is already
    /// pending/running.
    pub action_disabled: bool,
    /// Prerequisites that are not yet `Completed`.
    pub blocked_by: Vec<StepKey>,
    /// Shot completion for scene/shot-bearing steps.
    pub progress: Option<f64>,
    pub detail: StepDetail,
    pub credits_used: Option<f64>,
}

/// The whole view for one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisView {
    pub rows: Vec<StepRow>,
    pub overall_progress: f64,
    pub total_credits: f64,
    pub decision: PollDecision,
}

impl AnalysisView {
    pub fn build(snapshot: &StatusSnapshot, catalog: &StepCatalog) -> Self {
        let statuses = normalize(&snapshot.statuses, &catalog.aliases);
        let sets = CompletionSets::from_statuses(&statuses);

        let rows = statuses
            .iter()
            .map(|(key, status)| {
                let detail = status.detail();
                let gated = is_dependency_gated(key, &catalog.dependencies, &sets.completed);
                StepRow {
                    key: key.clone(),
                    title: catalog.title_for(key).to_string(),
                    state: status.state,
                    visible: !is_dependency_gated(key, &catalog.dependencies, &sets.unlocked),
                    action_disabled: gated || status.state.is_active(),
                    blocked_by: missing_prerequisites(key, &catalog.dependencies, &sets.completed),
                    progress: detail.scenes().map(scene_shot_progress),
                    detail,
                    credits_used: status.credit_info.map(|c| c.credits_used),
                }
            })
            .collect();

        Self {
            rows,
            overall_progress: overall_progress(&statuses),
            total_credits: total_credits_used(&statuses),
            decision: evaluate(&canonical_keys(&statuses, &catalog.aliases), &catalog.polling),
        }
    }

    pub fn row(&self, key: &StepKey) -> Option<&StepRow> {
        self.rows.iter().find(|r| &r.key == key)
    }

    pub fn visible_rows(&self) -> impl Iterator<Item = &StepRow> {
        self.rows.iter().filter(|r| r.visible)
    }
}

/// Compact serializable summary, used for structured log output.
#[derive(Debug, Clone, Serialize)]
pub struct ViewSummary {
    pub overall_pct: u8,
    pub completed: usize,
    pub total: usize,
    pub running: Vec<String>,
    pub failed: Vec<String>,
}

impl From<&AnalysisView> for ViewSummary {
    fn from(view: &AnalysisView) -> Self {
        let keys_in = |wanted: fn(&StepState) -> bool| -> Vec<String> {
            view.rows
                .iter()
                .filter(|r| wanted(&r.state))
                .map(|r| r.key.to_string())
                .collect()
        };

        Self {
            overall_pct: crate::progress::round_percent(view.overall_progress),
            completed: view.rows.iter().filter(|r| r.state.is_completed()).count(),
            total: view.rows.len(),
            running: keys_in(StepState::is_active),
            failed: keys_in(|s| *s == StepState::Failed),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::polling::IdleReason;
    use crate::status::StepStatus;

    fn snapshot(entries: Vec<(StepKey, StepStatus)>) -> StatusSnapshot {
        entries.into_iter().collect()
    }

    #[test]
    fn view_drops_alias_and_marks_visibility_tiers() {
        let snap = snapshot(vec![
            (StepKey::ScriptSummary, StepStatus::new(StepState::Completed)),
            (StepKey::SceneBreakdown, StepStatus::new(StepState::InProgress)),
            (StepKey::ShotList, StepStatus::new(StepState::NotStarted)),
            (StepKey::ProcessedImages, StepStatus::new(StepState::Completed)),
            (
                StepKey::ProcessScenesAndShots,
                StepStatus::new(StepState::NotStarted),
            ),
        ]);

        let view = AnalysisView::build(&snap, &StepCatalog::default());

        assert!(view.row(&StepKey::ProcessedImages).is_none());
        assert_eq!(view.rows.len(), 4);

        let shot_list = view.row(&StepKey::ShotList).unwrap();
        assert!(shot_list.visible);
        assert!(shot_list.action_disabled);
        assert_eq!(shot_list.blocked_by, vec![StepKey::SceneBreakdown]);

        let breakdown = view.row(&StepKey::SceneBreakdown).unwrap();
        assert!(breakdown.visible);
        // Already running.
        assert!(breakdown.action_disabled);

        let processing = view.row(&StepKey::ProcessScenesAndShots).unwrap();
        assert!(!processing.visible);

        assert_eq!(view.overall_progress, 25.0);
        assert_eq!(view.decision, PollDecision::Poll);
    }

    #[test]
    fn view_reports_scene_progress_and_credits() {
        let snap = snapshot(vec![
            (
                StepKey::PromptGenerator,
                StepStatus::new(StepState::Completed).with_credits(10.0),
            ),
            (
                StepKey::ProcessScenesAndShots,
                StepStatus::new(StepState::InProgress)
                    .with_credits(2.5)
                    .with_data(json!([
                        { "sceneId": 1, "shots": [
                            { "shotNumber": 1, "status": "Completed" },
                            { "shotNumber": 2, "status": "Completed" }
                        ]},
                        { "sceneId": 2, "shots": [
                            { "shotNumber": 1, "status": "Completed" },
                            { "shotNumber": 2, "status": "Pending" }
                        ]}
                    ])),
            ),
        ]);

        let view = AnalysisView::build(&snap, &StepCatalog::default());
        let row = view.row(&StepKey::ProcessScenesAndShots).unwrap();
        assert_eq!(row.progress, Some(75.0));
        assert_eq!(row.credits_used, Some(2.5));
        assert_eq!(view.total_credits, 12.5);
        assert!(view.row(&StepKey::PromptGenerator).unwrap().progress.is_none());
    }

    #[test]
    fn unknown_step_uses_raw_title_and_unrecognized_detail() {
        let snap = snapshot(vec![(
            StepKey::from_raw("voiceCasting"),
            StepStatus::new(StepState::Completed).with_data(json!({ "voice": "x" })),
        )]);

        let view = AnalysisView::build(&snap, &StepCatalog::default());
        let row = &view.rows[0];
        assert_eq!(row.title, "voiceCasting");
        assert_eq!(row.detail, StepDetail::Unrecognized);
        assert!(row.visible);
        assert!(!row.action_disabled);
        assert_eq!(view.decision, PollDecision::Idle(IdleReason::AllCompleted));
    }

    #[test]
    fn legacy_trailing_step_counts_for_idle_decision() {
        let snap = snapshot(vec![
            (StepKey::ScriptSummary, StepStatus::new(StepState::Completed)),
            (StepKey::PromptGenerator, StepStatus::new(StepState::Completed)),
            (StepKey::ProcessImages, StepStatus::new(StepState::NotStarted)),
            (StepKey::ProcessedImages, StepStatus::new(StepState::NotStarted)),
        ]);

        let view = AnalysisView::build(&snap, &StepCatalog::default());
        // Still displayed under the legacy key.
        assert!(view.row(&StepKey::ProcessedImages).is_some());
        assert_eq!(
            view.decision,
            PollDecision::Idle(IdleReason::OnlyTrailingStepsRemain)
        );
    }

    #[test]
    fn summary_lists_running_and_failed_steps() {
        let snap = snapshot(vec![
            (StepKey::ScriptSummary, StepStatus::new(StepState::Completed)),
            (StepKey::SceneBreakdown, StepStatus::new(StepState::Pending)),
            (StepKey::CharacterAnalysis, StepStatus::new(StepState::Failed)),
        ]);

        let view = AnalysisView::build(&snap, &StepCatalog::default());
        let summary = ViewSummary::from(&view);
        assert_eq!(summary.overall_pct, 33);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.running, vec!["sceneBreakdown".to_string()]);
        assert_eq!(summary.failed, vec!["characterAnalysis".to_string()]);
    }
}
