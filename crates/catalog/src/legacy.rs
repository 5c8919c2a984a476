//! Legacy catalog client fallback.
//!
//! A strictly optional secondary source kept for codes the current API does
//! not surface relationship data for. Same evidence shape as the primary
//! client, older endpoint and payload.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::CatalogError;
use crate::resolver::{LinkSource, RegionRef};
use crate::result::{LinkEvidence, ResolutionSource};

// ---------------------------------------------------------------------------
// Payload shape
// ---------------------------------------------------------------------------

/// Item description returned by the legacy lookup endpoint.
#[derive(Debug, Deserialize)]
pub struct LegacyItemPayload {
    #[serde(rename = "parentCode")]
    pub parent_code: Option<String>,

    /// Child variant codes when the looked-up code is a parent listing.
    #[serde(default)]
    pub variations: Vec<String>,
}

/// Extract link evidence from a legacy payload.
pub fn extract_evidence(payload: &LegacyItemPayload) -> Option<LinkEvidence> {
    if let Some(parent) = payload.parent_code.as_deref() {
        if !parent.trim().is_empty() {
            return Some(LinkEvidence::ParentRef(parent.trim().to_string()));
        }
    }
    if !payload.variations.is_empty() {
        return Some(LinkEvidence::ChildVariations(payload.variations.len()));
    }
    None
}

// ---------------------------------------------------------------------------
// LegacyCatalogClient
// ---------------------------------------------------------------------------

/// HTTP client for the legacy lookup endpoint.
pub struct LegacyCatalogClient {
    client: reqwest::Client,
    base_url: String,
}

impl LegacyCatalogClient {
    /// Create a client for the given legacy base URL.
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
impl LinkSource for LegacyCatalogClient {
    fn source(&self) -> ResolutionSource {
        ResolutionSource::LegacyApi
    }

    async fn resolve(
        &self,
        code: &str,
        region: &RegionRef,
    ) -> Result<Option<LinkEvidence>, CatalogError> {
        let url = format!("{}/items/lookup", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("code", code), ("marketplace", region.marketplace_id.as_str())])
            .send()
            .await?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(CatalogError::from_status(status));
        }

        let payload: LegacyItemPayload = response
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

    #[test]
    fn parent_code_extracted() {
        let payload: LegacyItemPayload =
            serde_json::from_str(r#"{"parentCode": "B0PARENT001"}"#).unwrap();
        assert_matches!(
            extract_evidence(&payload),
            Some(LinkEvidence::ParentRef(p)) if p == "B0PARENT001"
        );
    }

    #[test]
    fn variations_extracted_when_no_parent() {
        let payload: LegacyItemPayload =
            serde_json::from_str(r#"{"variations": ["B0CHILD0001"]}"#).unwrap();
        assert_matches!(extract_evidence(&payload), Some(LinkEvidence::ChildVariations(1)));
    }

    #[test]
    fn empty_payload_yields_nothing() {
        let payload: LegacyItemPayload = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(extract_evidence(&payload), None);
    }
}
