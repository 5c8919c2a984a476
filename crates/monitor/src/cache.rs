//! TTL-keyed cache of the last resolution per `(code, region)`.
//!
//! Backed by moka's async cache: lock-free concurrent reads, per-entry
//! TTL expiry, and a capacity bound as a defensive backstop — time-based
//! expiry is the real eviction mechanism at expected scale.

use std::time::{Duration, Instant};

use moka::future::Cache;
use moka::Expiry;

use linkwatch_catalog::CheckResult;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Configuration for the result cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL applied when the caller does not override it.
    pub default_ttl: Duration,
    /// Maximum number of entries.
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(600),
            max_capacity: 100_000,
        }
    }
}

impl CacheConfig {
    /// Sets the default TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Sets the maximum capacity.
    pub fn with_max_capacity(mut self, max_capacity: u64) -> Self {
        self.max_capacity = max_capacity;
        self
    }
}

// ---------------------------------------------------------------------------
// Key / entry
// ---------------------------------------------------------------------------

/// Cache key: one entry per `(code, region)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub code: String,
    pub region: String,
}

impl CacheKey {
    pub fn new(code: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            region: region.into(),
        }
    }
}

/// Stored value: the result plus its entry-specific TTL.
#[derive(Clone)]
struct CachedEntry {
    result: CheckResult,
    ttl: Duration,
}

/// Per-entry expiry driven by the TTL recorded at insert time.
struct PerEntryTtl;

impl Expiry<CacheKey, CachedEntry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &CachedEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

// ---------------------------------------------------------------------------
// ResultCache
// ---------------------------------------------------------------------------

/// TTL store of the last [`CheckResult`] per `(code, region)`.
pub struct ResultCache {
    cache: Cache<CacheKey, CachedEntry>,
    default_ttl: Duration,
}

impl ResultCache {
    pub fn new(config: CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self {
            cache,
            default_ttl: config.default_ttl,
        }
    }

    /// Look up a live entry. Expired entries are misses.
    pub async fn get(&self, code: &str, region: &str) -> Option<CheckResult> {
        self.cache
            .get(&CacheKey::new(code, region))
            .await
            .map(|entry| entry.result)
    }

    /// Store a result under the default TTL.
    pub async fn put(&self, result: CheckResult) {
        self.put_with_ttl(result, self.default_ttl).await;
    }

    /// Store a result with an explicit TTL override.
    pub async fn put_with_ttl(&self, result: CheckResult, ttl: Duration) {
        let key = CacheKey::new(&result.code, &result.region);
        self.cache.insert(key, CachedEntry { result, ttl }).await;
    }

    /// Drop the entry for one `(code, region)`, if present.
    pub async fn invalidate(&self, code: &str, region: &str) {
        self.cache.invalidate(&CacheKey::new(code, region)).await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use linkwatch_catalog::ResolutionSource;

    fn sample(code: &str) -> CheckResult {
        CheckResult::broken(code, "US", ResolutionSource::PrimaryApi)
    }

    #[tokio::test]
    async fn put_then_get_within_ttl() {
        let cache = ResultCache::new(CacheConfig::default());
        cache.put(sample("B0TEST00001")).await;

        let hit = cache.get("B0TEST00001", "US").await.unwrap();
        assert_eq!(hit.code, "B0TEST00001");
        assert!(!hit.has_link);
    }

    #[tokio::test]
    async fn get_after_ttl_is_a_miss() {
        let cache = ResultCache::new(CacheConfig::default());
        cache
            .put_with_ttl(sample("B0TEST00001"), Duration::from_millis(20))
            .await;

        assert!(cache.get("B0TEST00001", "US").await.is_some());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cache.get("B0TEST00001", "US").await.is_none());
    }

    #[tokio::test]
    async fn regions_are_isolated() {
        let cache = ResultCache::new(CacheConfig::default());
        cache.put(sample("B0TEST00001")).await;

        assert!(cache.get("B0TEST00001", "DE").await.is_none());
    }

    #[tokio::test]
    async fn invalidate_removes_entry() {
        let cache = ResultCache::new(CacheConfig::default());
        cache.put(sample("B0TEST00001")).await;
        cache.invalidate("B0TEST00001", "US").await;

        assert!(cache.get("B0TEST00001", "US").await.is_none());
    }
}
