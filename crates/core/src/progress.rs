//! Completion percentages.
//!
//! All functions return unrounded percentages clamped to `[0, 100]` and
//! return `0.0` instead of dividing by zero. Rounding for display is up to
//! the caller (see [`round_percent`]).

use crate::status::{SceneShotStatus, StatusMap, StepStatus};

/// `part / total * 100`, `0.0` when `total` is zero.
pub fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    clamp_percent(part as f64 / total as f64 * 100.0)
}

/// Clamp a percentage into `[0, 100]`. NaN maps to `0.0`.
pub fn clamp_percent(pct: f64) -> f64 {
    if pct.is_nan() {
        return 0.0;
    }
    pct.clamp(0.0, 100.0)
}

/// Round a percentage to the nearest integer for display.
pub fn round_percent(pct: f64) -> u8 {
    clamp_percent(pct).round() as u8
}

/// Share of steps in `statuses` that are `Completed`.
///
/// Callers pass the normalized set so legacy duplicates are not counted
/// twice.
pub fn overall_progress(statuses: &StatusMap) -> f64 {
    let completed = statuses.values().filter(|s| s.state.is_completed()).count();
    percent(completed, statuses.len())
}

/// Share of completed shots across every scene.
pub fn scene_shot_progress(scenes: &[SceneShotStatus]) -> f64 {
    let (completed, total) = scenes.iter().fold((0usize, 0usize), |(done, all), scene| {
        let scene_done = scene.shots.iter().filter(|s| s.status.is_completed()).count();
        (done + scene_done, all + scene.shots.len())
    });
    percent(completed, total)
}

/// Scene/shot progress for a step whose payload is a scene list.
///
/// Returns `None` for steps carrying any other payload (or none).
pub fn step_progress(status: &StepStatus) -> Option<f64> {
    status.detail().scenes().map(scene_shot_progress)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::status::{ShotStatus, StepState};
    use crate::step::StepKey;

    fn shot(n: i64, status: StepState) -> ShotStatus {
        ShotStatus {
            shot_number: n,
            status,
            error: None,
        }
    }

    // -- percent --------------------------------------------------------------

    #[test]
    fn percent_zero_total_is_zero() {
        assert_eq!(percent(0, 0), 0.0);
    }

    #[test]
    fn percent_never_exceeds_100() {
        assert_eq!(percent(5, 1), 100.0);
    }

    #[test]
    fn round_percent_rounds_half_up() {
        assert_eq!(round_percent(66.666), 67);
        assert_eq!(round_percent(12.5), 13);
        assert_eq!(round_percent(-3.0), 0);
        assert_eq!(round_percent(f64::NAN), 0);
    }

    // -- overall_progress -----------------------------------------------------

    #[test]
    fn overall_progress_empty_is_zero() {
        let progress = overall_progress(&StatusMap::new());
        assert_eq!(progress, 0.0);
        assert!(!progress.is_nan());
    }

    #[test]
    fn overall_progress_counts_completed_only() {
        let statuses: StatusMap = [
            (StepKey::ScriptSummary, StepState::Completed),
            (StepKey::SceneBreakdown, StepState::Completed),
            (StepKey::ShotList, StepState::InProgress),
            (StepKey::PromptGenerator, StepState::Incomplete),
        ]
        .into_iter()
        .map(|(k, s)| (k, StepStatus::new(s)))
        .collect();

        assert_eq!(overall_progress(&statuses), 50.0);
    }

    #[test]
    fn overall_progress_stays_in_bounds() {
        let states = [
            StepState::NotStarted,
            StepState::Pending,
            StepState::InProgress,
            StepState::Incomplete,
            StepState::Completed,
            StepState::Failed,
        ];
        for n in 0..states.len() {
            let statuses: StatusMap = states[..=n]
                .iter()
                .enumerate()
                .map(|(i, s)| (StepKey::from_raw(&format!("step{i}")), StepStatus::new(*s)))
                .collect();
            let pct = overall_progress(&statuses);
            assert!((0.0..=100.0).contains(&pct), "{pct} out of bounds");
        }
    }

    // -- scene_shot_progress --------------------------------------------------

    #[test]
    fn scene_shot_progress_three_of_four() {
        let scenes = vec![
            SceneShotStatus {
                scene_id: 1,
                shots: vec![shot(1, StepState::Completed), shot(2, StepState::Completed)],
            },
            SceneShotStatus {
                scene_id: 2,
                shots: vec![shot(1, StepState::Completed), shot(2, StepState::Pending)],
            },
        ];
        assert_eq!(scene_shot_progress(&scenes), 75.0);
    }

    #[test]
    fn scene_shot_progress_no_shots_is_zero() {
        let scenes = vec![SceneShotStatus {
            scene_id: 1,
            shots: vec![],
        }];
        assert_eq!(scene_shot_progress(&scenes), 0.0);
        assert_eq!(scene_shot_progress(&[]), 0.0);
    }

    // -- step_progress --------------------------------------------------------

    #[test]
    fn step_progress_reads_scene_payload() {
        let status = StepStatus::new(StepState::InProgress).with_data(json!([
            { "sceneId": 7, "shots": [
                { "shotNumber": 1, "status": "Completed" },
                { "shotNumber": 2, "status": "InProgress" }
            ]}
        ]));
        assert_eq!(step_progress(&status), Some(50.0));
    }

    #[test]
    fn step_progress_none_for_other_payloads() {
        assert_eq!(step_progress(&StepStatus::new(StepState::Completed)), None);

        let entities = StepStatus::new(StepState::Completed)
            .with_data(json!([{ "name": "ALICE", "status": "Completed" }]));
        assert_eq!(step_progress(&entities), None);
    }
}
