//! Normalized output of a link resolution.

use serde::Serialize;

use linkwatch_core::codes::normalize_parent_code;
use linkwatch_core::types::Timestamp;

// ---------------------------------------------------------------------------
// ResolutionSource
// ---------------------------------------------------------------------------

/// Which data source produced the final answer. Recorded for auditability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    PrimaryApi,
    LegacyApi,
    PageScrape,
}

impl ResolutionSource {
    /// Stable string form persisted in history records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrimaryApi => "primary_api",
            Self::LegacyApi => "legacy_api",
            Self::PageScrape => "page_scrape",
        }
    }
}

// ---------------------------------------------------------------------------
// LinkEvidence
// ---------------------------------------------------------------------------

/// Raw evidence of a variant relationship, as reported by a source.
///
/// Evidence is normalized into a [`CheckResult`] by the chain driver; sources
/// never decide broken/ok themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvidence {
    /// The source reported a parent reference for the checked code.
    ParentRef(String),
    /// The checked code is itself a parent with this many child variants.
    ChildVariations(usize),
}

// ---------------------------------------------------------------------------
// CheckResult
// ---------------------------------------------------------------------------

/// The normalized outcome of resolving one `(code, region)` pair.
///
/// Invariant: `parent_code` never equals `code` — a self-reference is
/// normalized to `None` before any broken/ok decision is made. `has_link` is
/// true iff a non-self parent was found or the source reported at least one
/// child variant.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub code: String,
    pub region: String,
    pub has_link: bool,
    pub parent_code: Option<String>,
    pub source: ResolutionSource,
    pub resolved_at: Timestamp,
}

impl CheckResult {
    /// Normalize raw evidence into a result.
    pub fn from_evidence(
        code: &str,
        region: &str,
        source: ResolutionSource,
        evidence: LinkEvidence,
    ) -> Self {
        let (has_link, parent_code) = match evidence {
            LinkEvidence::ParentRef(parent) => {
                match normalize_parent_code(code, Some(&parent)) {
                    Some(parent) => (true, Some(parent)),
                    // A self-referential parent carries no link information.
                    None => (false, None),
                }
            }
            LinkEvidence::ChildVariations(count) => (count >= 1, None),
        };

        Self {
            code: code.to_string(),
            region: region.to_string(),
            has_link,
            parent_code,
            source,
            resolved_at: chrono::Utc::now(),
        }
    }

    /// The conservative default: no link, no parent.
    ///
    /// Used when a source affirmatively found nothing and when the whole
    /// chain is exhausted.
    pub fn broken(code: &str, region: &str, source: ResolutionSource) -> Self {
        Self {
            code: code.to_string(),
            region: region.to_string(),
            has_link: false,
            parent_code: None,
            source,
            resolved_at: chrono::Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_ref_yields_link() {
        let result = CheckResult::from_evidence(
            "B0TEST00001",
            "US",
            ResolutionSource::PrimaryApi,
            LinkEvidence::ParentRef("B0PARENT001".to_string()),
        );
        assert!(result.has_link);
        assert_eq!(result.parent_code.as_deref(), Some("B0PARENT001"));
    }

    #[test]
    fn self_parent_is_normalized_to_broken() {
        let result = CheckResult::from_evidence(
            "B0TEST00001",
            "US",
            ResolutionSource::PrimaryApi,
            LinkEvidence::ParentRef("b0test00001".to_string()),
        );
        assert!(!result.has_link);
        assert!(result.parent_code.is_none());
    }

    #[test]
    fn child_variations_yield_link_without_parent() {
        let result = CheckResult::from_evidence(
            "B0TEST00001",
            "US",
            ResolutionSource::PrimaryApi,
            LinkEvidence::ChildVariations(3),
        );
        assert!(result.has_link);
        assert!(result.parent_code.is_none());
    }

    #[test]
    fn zero_child_variations_yield_broken() {
        let result = CheckResult::from_evidence(
            "B0TEST00001",
            "US",
            ResolutionSource::PrimaryApi,
            LinkEvidence::ChildVariations(0),
        );
        assert!(!result.has_link);
    }

    #[test]
    fn source_strings_are_stable() {
        assert_eq!(ResolutionSource::PrimaryApi.as_str(), "primary_api");
        assert_eq!(ResolutionSource::LegacyApi.as_str(), "legacy_api");
        assert_eq!(ResolutionSource::PageScrape.as_str(), "page_scrape");
    }
}
