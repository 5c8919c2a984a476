//! The ordered fallback chain.
//!
//! [`LinkResolver`] walks its sources in strict order — primary API, then
//! the optional legacy client, then the optional page scrape — until one
//! yields a usable answer. It never returns an error: an exhausted chain is
//! a broken link, tagged with the last source attempted.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use linkwatch_core::retry::RetryPolicy;

use crate::error::CatalogError;
use crate::legacy::LegacyCatalogClient;
use crate::primary::PrimaryCatalogClient;
use crate::result::{CheckResult, LinkEvidence, ResolutionSource};
use crate::scrape::PageScrapeSource;

/// Default timeout for a single upstream request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

// ---------------------------------------------------------------------------
// RegionRef
// ---------------------------------------------------------------------------

/// Region identity passed into every source call.
#[derive(Debug, Clone)]
pub struct RegionRef {
    /// Region code, e.g. `US`.
    pub name: String,
    /// Upstream marketplace identifier for this region.
    pub marketplace_id: String,
}

impl RegionRef {
    pub fn new(name: impl Into<String>, marketplace_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            marketplace_id: marketplace_id.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// LinkSource
// ---------------------------------------------------------------------------

/// One data source in the fallback chain.
///
/// Sources report raw [`LinkEvidence`] or its absence; they never decide
/// broken/ok themselves and never normalize parent codes.
#[async_trait]
pub trait LinkSource: Send + Sync {
    /// Which source this is, for result tagging and logs.
    fn source(&self) -> ResolutionSource;

    /// Look up relationship evidence for one code.
    ///
    /// `Ok(None)` means the source answered and found nothing — the chain
    /// moves on without retrying.
    async fn resolve(
        &self,
        code: &str,
        region: &RegionRef,
    ) -> Result<Option<LinkEvidence>, CatalogError>;
}

// ---------------------------------------------------------------------------
// ResolverConfig
// ---------------------------------------------------------------------------

/// Immutable resolver configuration, assembled once at startup.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Primary catalog API base URL.
    pub api_url: String,
    /// Legacy fallback base URL; `None` disables the legacy source.
    pub legacy_api_url: Option<String>,
    /// Public listing page base URL; `None` disables the page scrape.
    pub page_url: Option<String>,
    /// Timeout applied to every upstream request.
    pub request_timeout: Duration,
    /// Retry policy for transient source failures.
    pub retry: RetryPolicy,
}

impl ResolverConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            legacy_api_url: None,
            page_url: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryPolicy::for_catalog_calls(),
        }
    }

    pub fn with_legacy_api(mut self, url: impl Into<String>) -> Self {
        self.legacy_api_url = Some(url.into());
        self
    }

    pub fn with_page_scrape(mut self, url: impl Into<String>) -> Self {
        self.page_url = Some(url.into());
        self
    }
}

// ---------------------------------------------------------------------------
// LinkResolver
// ---------------------------------------------------------------------------

/// Walks the ordered source list and produces a [`CheckResult`].
pub struct LinkResolver {
    sources: Vec<Arc<dyn LinkSource>>,
    retry: RetryPolicy,
}

impl LinkResolver {
    /// Assemble the chain from configuration.
    ///
    /// Order is fixed: primary API, legacy client (if configured), page
    /// scrape (if configured).
    pub fn from_config(config: &ResolverConfig) -> Self {
        let mut sources: Vec<Arc<dyn LinkSource>> = vec![Arc::new(PrimaryCatalogClient::new(
            &config.api_url,
            config.request_timeout,
        ))];

        if let Some(url) = &config.legacy_api_url {
            sources.push(Arc::new(LegacyCatalogClient::new(url, config.request_timeout)));
        }

        if let Some(url) = &config.page_url {
            sources.push(Arc::new(PageScrapeSource::new(url, config.request_timeout)));
        }

        Self::with_sources(sources, config.retry.clone())
    }

    /// Build a chain from explicit sources. Used directly by tests.
    pub fn with_sources(sources: Vec<Arc<dyn LinkSource>>, retry: RetryPolicy) -> Self {
        Self { sources, retry }
    }

    /// Resolve one `(code, region)` pair.
    ///
    /// Never fails: every exit path produces a [`CheckResult`]. Transient
    /// source errors are retried per the policy before falling through to
    /// the next source; client errors fall through immediately.
    pub async fn resolve(&self, code: &str, region: &RegionRef) -> CheckResult {
        let mut last_source = ResolutionSource::PrimaryApi;

        for source in &self.sources {
            last_source = source.source();

            if let Some(evidence) = self.resolve_via(source.as_ref(), code, region).await {
                let result =
                    CheckResult::from_evidence(code, &region.name, last_source, evidence);
                if result.has_link {
                    tracing::debug!(
                        code,
                        region = %region.name,
                        source = last_source.as_str(),
                        parent = result.parent_code.as_deref().unwrap_or("-"),
                        "Link resolved"
                    );
                    return result;
                }
                // Evidence normalized to no-link (e.g. a self-referential
                // parent): treat as no usable answer and keep falling
                // through; a later source may still know the real parent.
            }
        }

        tracing::info!(
            code,
            region = %region.name,
            last_source = last_source.as_str(),
            "All sources exhausted, reporting broken link"
        );
        CheckResult::broken(code, &region.name, last_source)
    }

    /// Drive one source with bounded retry on transient failures.
    async fn resolve_via(
        &self,
        source: &dyn LinkSource,
        code: &str,
        region: &RegionRef,
    ) -> Option<LinkEvidence> {
        let mut attempt = 0u32;

        loop {
            match source.resolve(code, region).await {
                Ok(evidence) => return evidence,
                Err(e) if e.is_transient() && self.retry.should_retry(attempt) => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    tracing::warn!(
                        code,
                        region = %region.name,
                        source = source.source().as_str(),
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient source failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        code,
                        region = %region.name,
                        source = source.source().as_str(),
                        error = %e,
                        "Source failed, falling through"
                    );
                    return None;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
