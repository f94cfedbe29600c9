/// Errors raised while loading or validating step configuration.
///
/// The pure status functions never fail; only configuration loading
/// produces errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid catalog document: {0}")]
    InvalidCatalog(#[from] serde_json::Error),
}
