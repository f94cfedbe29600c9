//! Dependency gating between analysis steps.
//!
//! A static [`DependencyMap`] lists, per step, the steps that must be done
//! before it. Two completedness thresholds are derived from each snapshot
//! and must not be conflated:
//!
//! * [`CompletionSets::unlocked`] -- `InProgress` or `Completed`. Governs
//!   whether a dependent step is shown at all.
//! * [`CompletionSets::completed`] -- `Completed` only. Governs whether a
//!   dependent step's run action is enabled.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::status::{StatusMap, StepState};
use crate::step::StepKey;

// ---------------------------------------------------------------------------
// DependencyMap
// ---------------------------------------------------------------------------

/// Step -> ordered prerequisite steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyMap(BTreeMap<StepKey, Vec<StepKey>>);

impl DependencyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the prerequisites of `step`, replacing any previous entry.
    pub fn insert(&mut self, step: StepKey, prerequisites: Vec<StepKey>) {
        self.0.insert(step, prerequisites);
    }

    /// Prerequisites of `step`; empty when none are declared.
    pub fn prerequisites(&self, step: &StepKey) -> &[StepKey] {
        self.0.get(step).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StepKey, &[StepKey])> {
        self.0.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reject configurations where a step transitively depends on itself.
    ///
    /// A cycle would leave every step on it permanently gated.
    pub fn validate_acyclic(&self) -> Result<(), CoreError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit<'a>(
            map: &'a DependencyMap,
            step: &'a StepKey,
            marks: &mut BTreeMap<&'a StepKey, Mark>,
            path: &mut Vec<&'a StepKey>,
        ) -> Result<(), CoreError> {
            match marks.get(step) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Visiting) => {
                    let start = path.iter().position(|k| *k == step).unwrap_or(0);
                    let cycle: Vec<&str> = path[start..]
                        .iter()
                        .map(|k| k.as_str())
                        .chain(std::iter::once(step.as_str()))
                        .collect();
                    return Err(CoreError::Validation(format!(
                        "Dependency cycle detected: {}",
                        cycle.join(" -> ")
                    )));
                }
                None => {}
            }

            marks.insert(step, Mark::Visiting);
            path.push(step);
            for prerequisite in map.prerequisites(step) {
                visit(map, prerequisite, marks, path)?;
            }
            path.pop();
            marks.insert(step, Mark::Done);
            Ok(())
        }

        let mut marks = BTreeMap::new();
        let mut path = Vec::new();
        for step in self.0.keys() {
            visit(self, step, &mut marks, &mut path)?;
        }
        Ok(())
    }
}

impl FromIterator<(StepKey, Vec<StepKey>)> for DependencyMap {
    fn from_iter<I: IntoIterator<Item = (StepKey, Vec<StepKey>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The built-in pipeline dependencies.
pub fn default_dependencies() -> DependencyMap {
    use StepKey::*;

    [
        (CharacterAnalysis, vec![ScriptSummary]),
        (LocationAnalysis, vec![ScriptSummary]),
        (SceneBreakdown, vec![ScriptSummary]),
        (ShotList, vec![SceneBreakdown]),
        (
            PromptGenerator,
            vec![CharacterAnalysis, LocationAnalysis, ShotList],
        ),
        (ProcessImages, vec![PromptGenerator]),
        (ProcessScenesAndShots, vec![PromptGenerator]),
        (ProcessedImages, vec![PromptGenerator]),
    ]
    .into_iter()
    .collect()
}

// ---------------------------------------------------------------------------
// Completion sets
// ---------------------------------------------------------------------------

/// The two completedness thresholds derived from one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionSets {
    /// Steps that are `InProgress` or `Completed`.
    pub unlocked: BTreeSet<StepKey>,
    /// Steps that are `Completed`.
    pub completed: BTreeSet<StepKey>,
}

impl CompletionSets {
    pub fn from_statuses(statuses: &StatusMap) -> Self {
        let mut sets = Self::default();
        for (key, status) in statuses {
            match status.state {
                StepState::Completed => {
                    sets.unlocked.insert(key.clone());
                    sets.completed.insert(key.clone());
                }
                StepState::InProgress => {
                    sets.unlocked.insert(key.clone());
                }
                _ => {}
            }
        }
        sets
    }
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

/// Prerequisites of `step` that are not in `done`, in declared order.
pub fn missing_prerequisites(
    step: &StepKey,
    dependencies: &DependencyMap,
    done: &BTreeSet<StepKey>,
) -> Vec<StepKey> {
    dependencies
        .prerequisites(step)
        .iter()
        .filter(|p| !done.contains(*p))
        .cloned()
        .collect()
}

/// Whether `step` is held back by an unmet prerequisite.
///
/// Steps without declared prerequisites are never gated. Other reasons
/// to disable a step (its own state) are the caller's concern.
pub fn is_dependency_gated(
    step: &StepKey,
    dependencies: &DependencyMap,
    done: &BTreeSet<StepKey>,
) -> bool {
    dependencies
        .prerequisites(step)
        .iter()
        .any(|p| !done.contains(p))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
