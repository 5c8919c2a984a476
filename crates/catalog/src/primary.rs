//! Primary (authoritative) catalog API client.
//!
//! Queries the catalog item endpoint for relationship data. Two payload
//! shapes are understood: a direct `parentAsin` field and a `relationships`
//! array whose entries carry parent references or child code lists.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::CatalogError;
use crate::resolver::{LinkSource, RegionRef};
use crate::result::{LinkEvidence, ResolutionSource};

// ---------------------------------------------------------------------------
// Payload shapes
// ---------------------------------------------------------------------------

/// Catalog item description returned by the primary API.
#[derive(Debug, Deserialize)]
pub struct CatalogItemPayload {
    /// Direct parent reference, present on child variants.
    #[serde(rename = "parentAsin")]
    pub parent_asin: Option<String>,

    /// Relationship entries, present when the upstream expands variation data.
    #[serde(default)]
    pub relationships: Vec<RelationshipEntry>,
}

/// One entry of the `relationships` array.
///
/// Child variants carry `parentAsins`; parent listings carry `childAsins`.
#[derive(Debug, Deserialize)]
pub struct RelationshipEntry {
    #[serde(rename = "parentAsins", default)]
    pub parent_asins: Vec<String>,

    #[serde(rename = "childAsins", default)]
    pub child_asins: Vec<String>,
}

/// Extract link evidence from a catalog item payload.
///
/// Priority: direct parent field, then the first relationship entry with a
/// parent reference, then the first entry with child codes (the checked code
/// is itself the parent of a variation family).
pub fn extract_evidence(payload: &CatalogItemPayload) -> Option<LinkEvidence> {
    if let Some(parent) = payload.parent_asin.as_deref() {
        if !parent.trim().is_empty() {
            return Some(LinkEvidence::ParentRef(parent.trim().to_string()));
        }
    }

    for entry in &payload.relationships {
        if let Some(parent) = entry.parent_asins.iter().find(|p| !p.trim().is_empty()) {
            return Some(LinkEvidence::ParentRef(parent.trim().to_string()));
        }
        if !entry.child_asins.is_empty() {
            return Some(LinkEvidence::ChildVariations(entry.child_asins.len()));
        }
    }

    None
}

// ---------------------------------------------------------------------------
// PrimaryCatalogClient
// ---------------------------------------------------------------------------

/// HTTP client for the authoritative catalog endpoint.
pub struct PrimaryCatalogClient {
    client: reqwest::Client,
    base_url: String,
}

impl PrimaryCatalogClient {
    /// Create a client for the given API base URL.
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl LinkSource for PrimaryCatalogClient {
    fn source(&self) -> ResolutionSource {
        ResolutionSource::PrimaryApi
    }

    async fn resolve(
        &self,
        code: &str,
        region: &RegionRef,
    ) -> Result<Option<LinkEvidence>, CatalogError> {
        let url = format!("{}/catalog/items/{code}", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("marketplaceId", region.marketplace_id.as_str()),
                ("includedData", "relationships"),
            ])
            .send()
            .await?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(CatalogError::from_status(status));
        }

        let payload: CatalogItemPayload = response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;

        Ok(extract_evidence(&payload))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn parse(json: &str) -> CatalogItemPayload {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn direct_parent_field_wins() {
        let payload = parse(r#"{"parentAsin": "B0PARENT001"}"#);
        assert_matches!(
            extract_evidence(&payload),
            Some(LinkEvidence::ParentRef(p)) if p == "B0PARENT001"
        );
    }

    #[test]
    fn relationship_parent_reference() {
        let payload = parse(
            r#"{"relationships": [{"parentAsins": ["B0PARENT001"], "childAsins": []}]}"#,
        );
        assert_matches!(
            extract_evidence(&payload),
            Some(LinkEvidence::ParentRef(p)) if p == "B0PARENT001"
        );
    }

    #[test]
    fn relationship_child_list_means_checked_code_is_parent() {
        let payload = parse(
            r#"{"relationships": [{"childAsins": ["B0CHILD0001", "B0CHILD0002"]}]}"#,
        );
        assert_matches!(
            extract_evidence(&payload),
            Some(LinkEvidence::ChildVariations(2))
        );
    }

    #[test]
    fn direct_field_beats_relationships() {
        let payload = parse(
            r#"{
                "parentAsin": "B0PARENT001",
                "relationships": [{"childAsins": ["B0CHILD0001"]}]
            }"#,
        );
        assert_matches!(
            extract_evidence(&payload),
            Some(LinkEvidence::ParentRef(p)) if p == "B0PARENT001"
        );
    }

    #[test]
    fn empty_payload_yields_nothing() {
        let payload = parse(r#"{}"#);
        assert_eq!(extract_evidence(&payload), None);
    }

    #[test]
    fn blank_parent_strings_are_skipped() {
        let payload = parse(
            r#"{
                "parentAsin": "  ",
                "relationships": [{"parentAsins": ["", "B0PARENT001"]}]
            }"#,
        );
        assert_matches!(
            extract_evidence(&payload),
            Some(LinkEvidence::ParentRef(p)) if p == "B0PARENT001"
        );
    }
}
