//! Typed identifiers for analysis pipeline steps.
//!
//! The backend keys its status document by camelCase step names. Known
//! names map to dedicated variants; anything else is carried verbatim in
//! [`StepKey::Other`] so a snapshot containing a step this build has never
//! heard of still round-trips and displays under its raw key.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const KEY_SCRIPT_SUMMARY: &str = "scriptSummary";
pub const KEY_CHARACTER_ANALYSIS: &str = "characterAnalysis";
pub const KEY_LOCATION_ANALYSIS: &str = "locationAnalysis";
pub const KEY_SCENE_BREAKDOWN: &str = "sceneBreakdown";
pub const KEY_SHOT_LIST: &str = "shotList";
pub const KEY_PROMPT_GENERATOR: &str = "promptGenerator";
pub const KEY_PROCESS_IMAGES: &str = "processImages";
pub const KEY_PROCESS_SCENES_AND_SHOTS: &str = "processScenesAndShots";

/// Legacy name of `processScenesAndShots`, still present on older versions.
pub const KEY_PROCESSED_IMAGES: &str = "processedImages";

/// All step keys this build knows about, in pipeline order.
pub const KNOWN_STEP_KEYS: &[&str] = &[
    KEY_SCRIPT_SUMMARY,
    KEY_CHARACTER_ANALYSIS,
    KEY_LOCATION_ANALYSIS,
    KEY_SCENE_BREAKDOWN,
    KEY_SHOT_LIST,
    KEY_PROMPT_GENERATOR,
    KEY_PROCESS_IMAGES,
    KEY_PROCESS_SCENES_AND_SHOTS,
    KEY_PROCESSED_IMAGES,
];

// ---------------------------------------------------------------------------
// StepKey
// ---------------------------------------------------------------------------

/// Identifier of one analysis step.
///
/// Variant order is pipeline order, so a `BTreeMap<StepKey, _>` iterates
/// steps the way they run. Unknown keys sort after all known ones.
///
/// Build keys through [`StepKey::from_raw`] (or `From<&str>`): constructing
/// `Other` with a known name by hand produces a key that never matches
/// the corresponding variant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StepKey {
    ScriptSummary,
    CharacterAnalysis,
    LocationAnalysis,
    SceneBreakdown,
    ShotList,
    PromptGenerator,
    ProcessImages,
    ProcessScenesAndShots,
    ProcessedImages,
    Other(String),
}

impl StepKey {
    /// Map a raw wire key to its typed form. Never fails.
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            KEY_SCRIPT_SUMMARY => Self::ScriptSummary,
            KEY_CHARACTER_ANALYSIS => Self::CharacterAnalysis,
            KEY_LOCATION_ANALYSIS => Self::LocationAnalysis,
            KEY_SCENE_BREAKDOWN => Self::SceneBreakdown,
            KEY_SHOT_LIST => Self::ShotList,
            KEY_PROMPT_GENERATOR => Self::PromptGenerator,
            KEY_PROCESS_IMAGES => Self::ProcessImages,
            KEY_PROCESS_SCENES_AND_SHOTS => Self::ProcessScenesAndShots,
            KEY_PROCESSED_IMAGES => Self::ProcessedImages,
            other => Self::Other(other.to_string()),
        }
    }

    /// The wire form of this key.
    pub fn as_str(&self) -> &str {
        match self {
            Self::ScriptSummary => KEY_SCRIPT_SUMMARY,
            Self::CharacterAnalysis => KEY_CHARACTER_ANALYSIS,
            Self::LocationAnalysis => KEY_LOCATION_ANALYSIS,
            Self::SceneBreakdown => KEY_SCENE_BREAKDOWN,
            Self::ShotList => KEY_SHOT_LIST,
            Self::PromptGenerator => KEY_PROMPT_GENERATOR,
            Self::ProcessImages => KEY_PROCESS_IMAGES,
            Self::ProcessScenesAndShots => KEY_PROCESS_SCENES_AND_SHOTS,
            Self::ProcessedImages => KEY_PROCESSED_IMAGES,
            Self::Other(raw) => raw,
        }
    }

    /// Whether this key is one of the names compiled into this build.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<&str> for StepKey {
    fn from(raw: &str) -> Self {
        Self::from_raw(raw)
    }
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StepKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StepKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_raw(&raw))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
