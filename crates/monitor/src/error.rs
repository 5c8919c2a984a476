//! Orchestration error type.

use linkwatch_core::types::DbId;

/// Errors surfaced by the check orchestrator.
///
/// Per-item resolution problems never appear here — the resolver chain
/// converts them into conservative broken results. What remains is
/// configuration mistakes, database failures on the group/batch paths, and
/// the rare aborted in-flight computation.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Invalid limiter/executor configuration. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A check was requested for a region with no configured quota.
    #[error("No quota configured for region '{0}'")]
    UnknownRegion(String),

    /// A check was requested for a malformed catalog code.
    #[error("Invalid catalog code: {0}")]
    InvalidCode(String),

    /// The variant group does not exist.
    #[error("Variant group {0} not found")]
    GroupNotFound(DbId),

    /// A shared in-flight check was dropped before producing a result.
    #[error("In-flight check for '{0}' was aborted")]
    CheckAborted(String),

    /// Database failure on a group/batch read path.
    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
}
