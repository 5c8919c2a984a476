//! Page-scrape fallback: last resort of the chain.
//!
//! Fetches the public listing page and extracts a parent identifier by
//! trying a fixed, ordered list of known embedding shapes. First match
//! wins. Fetch errors never propagate — the scrape source reports "no
//! evidence" so the chain terminates with a broken result instead of an
//! error.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use crate::error::CatalogError;
use crate::resolver::{LinkSource, RegionRef};
use crate::result::{LinkEvidence, ResolutionSource};

// ---------------------------------------------------------------------------
// Extraction patterns
// ---------------------------------------------------------------------------

/// Known embedding shapes for the parent identifier, in priority order.
///
/// 1. JSON blob in page state: `"parentAsin":"B0..."`.
/// 2. Snake-case variant used by older page templates.
/// 3. Data attribute on the variation widget.
static PARENT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#""parentAsin"\s*:\s*"([A-Za-z0-9]+)""#,
        r#""parent_asin"\s*:\s*"([A-Za-z0-9]+)""#,
        r#"data-parent-asin="([A-Za-z0-9]+)""#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Extract a parent code from raw page content.
///
/// Patterns are tried in order; the first capture wins.
pub fn extract_parent_code(body: &str) -> Option<String> {
    for pattern in PARENT_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(body) {
            return Some(caps[1].to_string());
        }
    }
    None
}

// ---------------------------------------------------------------------------
// PageScrapeSource
// ---------------------------------------------------------------------------

/// Fetches the public listing page for a code.
pub struct PageScrapeSource {
    client: reqwest::Client,
    base_url: String,
}

impl PageScrapeSource {
    /// Create a scrape source for the given public site base URL.
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

    /// Fetch the listing page body, or `None` on any fetch problem.
    async fn fetch_page(&self, code: &str, region: &RegionRef) -> Option<String> {
        let url = format!("{}/dp/{code}", self.base_url);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(code, region = %region.name, error = %e, "Listing page fetch failed");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                code,
                region = %region.name,
                status = response.status().as_u16(),
                "Listing page returned non-success status"
            );
            return None;
        }

        match response.text().await {
            Ok(body) => Some(body),
            Err(e) => {
                tracing::warn!(code, region = %region.name, error = %e, "Listing page body read failed");
                None
            }
        }
    }
}

#[async_trait]
impl LinkSource for PageScrapeSource {
    fn source(&self) -> ResolutionSource {
        ResolutionSource::PageScrape
    }

    /// Never returns `Err`: the scrape is the terminal fallback, so any
    /// failure is reported as absent evidence and the chain ends with a
    /// broken result.
    async fn resolve(
        &self,
        code: &str,
        region: &RegionRef,
    ) -> Result<Option<LinkEvidence>, CatalogError> {
        let Some(body) = self.fetch_page(code, region).await else {
            return Ok(None);
        };

        Ok(extract_parent_code(&body).map(LinkEvidence::ParentRef))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_json_embedded_parent() {
        let body = r#"<script>var state = {"parentAsin":"B0PARENT001","foo":1};</script>"#;
        assert_eq!(extract_parent_code(body), Some("B0PARENT001".to_string()));
    }

    #[test]
    fn extracts_snake_case_parent() {
        let body = r#"{"parent_asin": "B0PARENT002"}"#;
        assert_eq!(extract_parent_code(body), Some("B0PARENT002".to_string()));
    }

    #[test]
    fn extracts_data_attribute_parent() {
        let body = r#"<div class="variations" data-parent-asin="B0PARENT003"></div>"#;
        assert_eq!(extract_parent_code(body), Some("B0PARENT003".to_string()));
    }

    #[test]
    fn pattern_priority_is_fixed() {
        // Both shapes present: the JSON blob outranks the data attribute.
        let body = r#"
            <div data-parent-asin="B0ATTRIB001"></div>
            <script>{"parentAsin":"B0JSONBLOB1"}</script>
        "#;
        assert_eq!(extract_parent_code(body), Some("B0JSONBLOB1".to_string()));
    }

    #[test]
    fn page_without_parent_yields_nothing() {
        let body = "<html><body>Standalone listing</body></html>";
        assert_eq!(extract_parent_code(body), None);
    }

    #[tokio::test]
    async fn fetch_error_yields_no_evidence_not_an_error() {
        // Nothing listens on this port: the connection is refused.
        let source = PageScrapeSource::new("http://127.0.0.1:9", Duration::from_millis(200));
        let region = RegionRef::new("US", "MKT1");

        let evidence = source.resolve("B0TEST00001", &region).await.unwrap();
        assert_eq!(evidence, None);
    }
}
