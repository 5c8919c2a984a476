//! Check status constants and derivation.
//!
//! The persisted status of a history record is one of three strings. A
//! record is `error` only when the check itself failed to execute; a check
//! that ran and found no link is `broken`, never `error`.

use crate::error::CoreError;

/// The item has a resolvable parent/variant link.
pub const STATUS_OK: &str = "ok";
/// The item has no resolvable parent/variant link.
pub const STATUS_BROKEN: &str = "broken";
/// The check for this item failed to execute.
pub const STATUS_ERROR: &str = "error";

/// All valid check statuses.
pub const VALID_STATUSES: &[&str] = &[STATUS_OK, STATUS_BROKEN, STATUS_ERROR];

/// Derive a persisted status from a link determination.
pub fn status_for_link(has_link: bool) -> &'static str {
    if has_link {
        STATUS_OK
    } else {
        STATUS_BROKEN
    }
}

/// Validate that a status string is one of the known statuses.
pub fn validate_status(status: &str) -> Result<(), CoreError> {
    if VALID_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Unknown check status: '{status}'. Valid statuses: {}",
            VALID_STATUSES.join(", ")
        )))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
