//! Status snapshot data model.
//!
//! A [`StatusSnapshot`] is the whole status document returned by one
//! fetch. It is never mutated locally: each fetch replaces the previous
//! snapshot wholesale.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::step::StepKey;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const STATE_NOT_STARTED: &str = "NotStarted";
pub const STATE_PENDING: &str = "Pending";
pub const STATE_IN_PROGRESS: &str = "InProgress";
pub const STATE_INCOMPLETE: &str = "Incomplete";
pub const STATE_COMPLETED: &str = "Completed";
pub const STATE_FAILED: &str = "Failed";

/// All valid step state strings (wire form).
pub const VALID_STEP_STATES: &[&str] = &[
    STATE_NOT_STARTED,
    STATE_PENDING,
    STATE_IN_PROGRESS,
    STATE_INCOMPLETE,
    STATE_COMPLETED,
    STATE_FAILED,
];

// ---------------------------------------------------------------------------
// StepState
// ---------------------------------------------------------------------------

/// Lifecycle state of a step, a shot, or an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepState {
    NotStarted,
    Pending,
    InProgress,
    Incomplete,
    Completed,
    Failed,
}

impl StepState {
    /// Parse a wire value. Accepts the PascalCase form and its snake_case
    /// spelling (`"in_progress"`).
    pub fn from_str_value(s: &str) -> Result<Self, String> {
        match s {
            STATE_NOT_STARTED | "not_started" => Ok(Self::NotStarted),
            STATE_PENDING | "pending" => Ok(Self::Pending),
            STATE_IN_PROGRESS | "in_progress" => Ok(Self::InProgress),
            STATE_INCOMPLETE | "incomplete" => Ok(Self::Incomplete),
            STATE_COMPLETED | "completed" => Ok(Self::Completed),
            STATE_FAILED | "failed" => Ok(Self::Failed),
            _ => Err(format!(
                "Invalid step state '{s}'. Must be one of: {}",
                VALID_STEP_STATES.join(", ")
            )),
        }
    }

    /// Convert to the wire value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => STATE_NOT_STARTED,
            Self::Pending => STATE_PENDING,
            Self::InProgress => STATE_IN_PROGRESS,
            Self::Incomplete => STATE_INCOMPLETE,
            Self::Completed => STATE_COMPLETED,
            Self::Failed => STATE_FAILED,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Whether the backend is currently working on (or about to start) it.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }
}

impl Serialize for StepState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StepState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_str_value(&raw).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Step status
// ---------------------------------------------------------------------------

/// Credits consumed by one step run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditInfo {
    pub credits_used: f64,
}

/// Status of a single analysis step as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepStatus {
    #[serde(rename = "status", alias = "state")]
    pub state: StepState,
    /// Step-specific payload: per-scene shot statuses, per-entity
    /// statuses, or something this crate does not interpret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_info: Option<CreditInfo>,
}

impl StepStatus {
    /// A status with no payload and no credit info.
    pub fn new(state: StepState) -> Self {
        Self {
            state,
            data: None,
            credit_info: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_credits(mut self, credits_used: f64) -> Self {
        self.credit_info = Some(CreditInfo { credits_used });
        self
    }

    /// Interpret the opaque payload.
    pub fn detail(&self) -> StepDetail {
        StepDetail::from_data(self.data.as_ref())
    }
}

/// Step statuses keyed by step, in pipeline order.
pub type StatusMap = BTreeMap<StepKey, StepStatus>;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// The full status document returned by one fetch.
///
/// Deserializes from either `{"statuses": {...}}` or the bare map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "SnapshotWire")]
pub struct StatusSnapshot {
    pub statuses: StatusMap,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotWire {
    Wrapped { statuses: StatusMap },
    Bare(StatusMap),
}

impl From<SnapshotWire> for StatusSnapshot {
    fn from(wire: SnapshotWire) -> Self {
        match wire {
            SnapshotWire::Wrapped { statuses } | SnapshotWire::Bare(statuses) => Self { statuses },
        }
    }
}

impl StatusSnapshot {
    pub fn new(statuses: StatusMap) -> Self {
        Self { statuses }
    }

    pub fn get(&self, key: &StepKey) -> Option<&StepStatus> {
        self.statuses.get(key)
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

impl FromIterator<(StepKey, StepStatus)> for StatusSnapshot {
    fn from_iter<I: IntoIterator<Item = (StepKey, StepStatus)>>(iter: I) -> Self {
        Self {
            statuses: iter.into_iter().collect(),
        }
    }
}

/// Sum of credits used across the given statuses.
pub fn total_credits_used(statuses: &StatusMap) -> f64 {
    statuses
        .values()
        .filter_map(|s| s.credit_info.map(|c| c.credits_used))
        .sum()
}

// ---------------------------------------------------------------------------
// Step payloads
// ---------------------------------------------------------------------------

/// Status of one shot inside a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShotStatus {
    pub shot_number: i64,
    pub status: StepState,
    #[serde(default)]
    pub error: Option<String>,
}

/// Per-scene shot statuses, carried by scene/shot-bearing steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneShotStatus {
    pub scene_id: i64,
    pub shots: Vec<ShotStatus>,
}

/// Status of one analysed entity (a character, a location).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityStatus {
    pub name: String,
    pub status: StepState,
    #[serde(default)]
    pub error: Option<String>,
}

/// Interpreted form of a step's `data` payload.
#[derive(Debug, Clone, PartialEq)]
pub enum StepDetail {
    SceneShots(Vec<SceneShotStatus>),
    Entities(Vec<EntityStatus>),
    /// No payload, or an empty list.
    Absent,
    /// A payload whose shape is not recognized; hosts show a placeholder.
    Unrecognized,
}

impl StepDetail {
    /// Interpret a payload. Never fails: unknown shapes become
    /// [`StepDetail::Unrecognized`].
    ///
    /// Accepted shapes are a bare list, or an object wrapping the list
    /// under `scenes` / `entities`.
    pub fn from_data(data: Option<&serde_json::Value>) -> Self {
        let Some(value) = data else {
            return Self::Absent;
        };

        let list = match value {
            serde_json::Value::Null => return Self::Absent,
            serde_json::Value::Array(items) => items,
            serde_json::Value::Object(obj) => {
                match obj.get("scenes").or_else(|| obj.get("entities")) {
                    Some(serde_json::Value::Array(items)) => items,
                    _ => return Self::Unrecognized,
                }
            }
            _ => return Self::Unrecognized,
        };

        if list.is_empty() {
            return Self::Absent;
        }

        let items = serde_json::Value::Array(list.clone());
        if let Ok(scenes) = serde_json::from_value::<Vec<SceneShotStatus>>(items.clone()) {
            return Self::SceneShots(scenes);
        }
        if let Ok(entities) = serde_json::from_value::<Vec<EntityStatus>>(items) {
            return Self::Entities(entities);
        }
        Self::Unrecognized
    }

    /// The scene list, if this payload is scene/shot-bearing.
    pub fn scenes(&self) -> Option<&[SceneShotStatus]> {
        match self {
            Self::SceneShots(scenes) => Some(scenes),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
