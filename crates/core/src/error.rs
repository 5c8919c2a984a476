//! Workspace-wide core error type.

/// Errors produced by pure core logic (validation, normalization).
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// An input value failed validation.
    #[error("Validation error: {0}")]
    Validation(String),
}
