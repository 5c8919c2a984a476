//! Catalog-code validation and normalization helpers.
//!
//! Catalog codes are opaque upstream identifiers (e.g. `B0TEST00001`). The
//! rules here are deliberately loose: uppercase alphanumerics, bounded
//! length. Parent-code normalization enforces the one hard invariant of the
//! whole system: a check result never reports an item as its own parent.

use crate::error::CoreError;

/// Maximum accepted length of a catalog code.
const MAX_CODE_LEN: usize = 32;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a catalog code.
///
/// Rules:
/// - Must not be empty (after trimming).
/// - Must not exceed [`MAX_CODE_LEN`] characters.
/// - Must contain only ASCII alphanumeric characters.
pub fn validate_catalog_code(code: &str) -> Result<(), CoreError> {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "Catalog code must not be empty".to_string(),
        ));
    }
    if trimmed.len() > MAX_CODE_LEN {
        return Err(CoreError::Validation(format!(
            "Catalog code must not exceed {MAX_CODE_LEN} characters"
        )));
    }
    if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CoreError::Validation(format!(
            "Catalog code may only contain alphanumeric characters, got: '{trimmed}'"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalize a parent code reported by an upstream source.
///
/// Returns `None` when the reported parent is empty or refers to the checked
/// code itself (compared case-insensitively). A self-reference carries no
/// link information and must never be stored as a parent.
pub fn normalize_parent_code(code: &str, parent: Option<&str>) -> Option<String> {
    let parent = parent?.trim();
    if parent.is_empty() {
        return None;
    }
    if parent.eq_ignore_ascii_case(code.trim()) {
        return None;
    }
    Some(parent.to_string())
}

/// Zero-padded (8-digit) display form of a batch sequence number,
/// e.g. `00000042`.
pub fn format_batch_seq(seq: i64) -> String {
    format!("{seq:08}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
