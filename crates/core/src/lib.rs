//! Analysis status view-model.
//!
//! Pure, synchronous logic over a fetched status snapshot: step catalog
//! configuration, legacy-alias normalization, progress percentages,
//! dependency gating, and the keep-polling decision. Nothing in this
//! crate performs I/O; callers pass already-resolved data in and get
//! plain values back.

pub mod catalog;
pub mod error;
pub mod gate;
pub mod normalize;
pub mod polling;
pub mod progress;
pub mod status;
pub mod step;
pub mod view;

pub use catalog::StepCatalog;
pub use error::CoreError;
pub use status::{StatusMap, StatusSnapshot, StepState, StepStatus};
pub use step::StepKey;
