//! Static step configuration.
//!
//! A [`StepCatalog`] bundles everything the view-model needs that does not
//! come from the backend: display titles, the legacy-alias table, the
//! dependency map and the polling policy. It is built once at startup and
//! validated before use.
//!
//! Overrides are read from a JSON document; sections that are missing keep
//! the built-in values:
//!
//! ```json
//! {
//!   "titles": { "sceneBreakdown": "Scenes" },
//!   "aliases": { "processedImages": "processScenesAndShots" },
//!   "dependencies": { "shotList": ["sceneBreakdown"] },
//!   "polling": {
//!     "intervalMs": 5000,
//!     "terminalGate": "promptGenerator",
//!     "trailingSteps": ["processImages", "processScenesAndShots"]
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::error::CoreError;
use crate::gate::{default_dependencies, DependencyMap};
use crate::normalize::{default_aliases, AliasTable};
use crate::polling::PollingPolicy;
use crate::step::StepKey;

/// Titles of the built-in steps.
fn default_titles() -> BTreeMap<StepKey, String> {
    [
        (StepKey::ScriptSummary, "Script Summary"),
        (StepKey::CharacterAnalysis, "Character Analysis"),
        (StepKey::LocationAnalysis, "Location Analysis"),
        (StepKey::SceneBreakdown, "Scene Breakdown"),
        (StepKey::ShotList, "Shot List"),
        (StepKey::PromptGenerator, "Prompt Generator"),
        (StepKey::ProcessImages, "Image Processing"),
        (StepKey::ProcessScenesAndShots, "Scene & Shot Processing"),
        (StepKey::ProcessedImages, "Processed Images"),
    ]
    .into_iter()
    .map(|(k, t)| (k, t.to_string()))
    .collect()
}

/// Immutable step configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct StepCatalog {
    pub titles: BTreeMap<StepKey, String>,
    pub aliases: AliasTable,
    pub dependencies: DependencyMap,
    pub polling: PollingPolicy,
}

impl Default for StepCatalog {
    fn default() -> Self {
        Self {
            titles: default_titles(),
            aliases: default_aliases(),
            dependencies: default_dependencies(),
            polling: PollingPolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CatalogDocument {
    titles: Option<BTreeMap<StepKey, String>>,
    aliases: Option<AliasTable>,
    dependencies: Option<DependencyMap>,
    polling: Option<PollingDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct PollingDocument {
    interval_ms: Option<u64>,
    terminal_gate: Option<StepKey>,
    trailing_steps: Option<Vec<StepKey>>,
}

impl StepCatalog {
    /// Parse an override document and validate the result.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let doc: CatalogDocument = serde_json::from_str(json)?;
        let defaults = Self::default();

        let polling = match doc.polling {
            Some(p) => PollingPolicy {
                interval: p
                    .interval_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.polling.interval),
                terminal_gate: p.terminal_gate.unwrap_or(defaults.polling.terminal_gate),
                trailing_steps: p.trailing_steps.unwrap_or(defaults.polling.trailing_steps),
            },
            None => defaults.polling,
        };

        let catalog = Self {
            titles: doc.titles.unwrap_or(defaults.titles),
            aliases: doc.aliases.unwrap_or(defaults.aliases),
            dependencies: doc.dependencies.unwrap_or(defaults.dependencies),
            polling,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Check the catalog for configurations the view-model cannot work with.
    pub fn validate(&self) -> Result<(), CoreError> {
        self.dependencies.validate_acyclic()?;

        for (alias, canonical) in &self.aliases {
            if alias == canonical {
                return Err(CoreError::Validation(format!(
                    "Alias '{alias}' must not map to itself"
                )));
            }
            if self.aliases.contains_key(canonical) {
                return Err(CoreError::Validation(format!(
                    "Alias '{alias}' maps to '{canonical}', which is itself an alias"
                )));
            }
        }

        if self.polling.interval.is_zero() {
            return Err(CoreError::Validation(
                "Polling interval must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Display title for `key`; the raw key when no title is configured.
    pub fn title_for<'a>(&'a self, key: &'a StepKey) -> &'a str {
        self.titles
            .get(key)
            .map(String::as_str)
            .unwrap_or_else(|| key.as_str())
    }

    /// Replace the polling interval, e.g. from an environment override.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.polling.interval = interval;
        self
    }
}
