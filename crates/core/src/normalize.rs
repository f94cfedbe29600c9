//! Legacy step-key reconciliation.
//!
//! Older script versions report some steps under a previous name. The
//! normalizer is a display filter: when both the legacy and the current
//! key are present the legacy entry is dropped, otherwise the legacy entry
//! is kept as-is under its own key. Nothing is renamed.

use std::collections::BTreeMap;

use crate::status::StatusMap;
use crate::step::StepKey;

/// Legacy-alias table: `alias -> canonical`.
pub type AliasTable = BTreeMap<StepKey, StepKey>;

/// The built-in alias table.
pub fn default_aliases() -> AliasTable {
    BTreeMap::from([(StepKey::ProcessedImages, StepKey::ProcessScenesAndShots)])
}

/// Keep exactly one entry per logical step.
///
/// Canonical keys are always kept. An alias survives only when its
/// canonical key is absent from `statuses`.
pub fn normalize(statuses: &StatusMap, aliases: &AliasTable) -> StatusMap {
    statuses
        .iter()
        .filter(|(key, _)| match aliases.get(*key) {
            Some(canonical) => !statuses.contains_key(canonical),
            None => true,
        })
        .map(|(key, status)| (key.clone(), status.clone()))
        .collect()
}

/// Re-key aliases that survived [`normalize`] under their canonical key.
///
/// Used where a step is matched by its current name, such as the trailing
/// steps of the polling decision. Expects normalized input; if several
/// aliases of one canonical key survive, the first in key order wins.
pub fn canonical_keys(normalized: &StatusMap, aliases: &AliasTable) -> StatusMap {
    let mut out = StatusMap::new();
    for (key, status) in normalized {
        let key = aliases.get(key).unwrap_or(key);
        out.entry(key.clone()).or_insert_with(|| status.clone());
    }
    out
}
