//! Worker configuration loaded from environment variables.
//!
//! All defaults suit local development; production overrides everything via
//! the environment. Invalid values are fatal here, at startup — nothing
//! later in the process revalidates quotas or concurrency.

use std::collections::HashMap;
use std::time::Duration;

use linkwatch_catalog::{RegionRef, ResolverConfig};
use linkwatch_core::error::CoreError;
use linkwatch_monitor::limiter::QuotaConfig;

/// Per-region settings, assembled from `<VAR>_<REGION>` variables.
#[derive(Debug, Clone)]
pub struct RegionSettings {
    /// Region code, e.g. `US`.
    pub name: String,
    /// Upstream marketplace identifier.
    pub marketplace_id: String,
    /// Admission ceilings for this region.
    pub quota: QuotaConfig,
    /// Webhook URL; absent means notifications are disabled for the region.
    pub webhook_url: Option<String>,
    /// Batch cadence.
    pub check_interval: Duration,
}

/// Monitor configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Monitored regions, in `REGIONS` order.
    pub regions: Vec<RegionSettings>,
    /// Primary catalog API base URL.
    pub api_url: String,
    /// Legacy fallback base URL; absent disables the legacy source.
    pub legacy_api_url: Option<String>,
    /// Public listing page base URL; absent disables the page scrape.
    pub page_url: Option<String>,
    /// Bounded executor slots for resolver runs.
    pub resolver_concurrency: usize,
    /// Result cache TTL.
    pub cache_ttl: Duration,
    /// Sub-batches per region run.
    pub batch_partitions: usize,
    /// Regions per notification dispatch batch.
    pub notify_batch_size: usize,
    /// Pause between notification dispatch batches.
    pub notify_batch_pause: Duration,
    /// History rows older than this many days are pruned.
    pub history_retention_days: i64,
}

impl MonitorConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default | Notes                          |
    /// |---------------------------|---------|--------------------------------|
    /// | `DATABASE_URL`            | —       | required                       |
    /// | `REGIONS`                 | `US`    | comma-separated                |
    /// | `MARKETPLACE_ID_<R>`      | —       | required per region            |
    /// | `QUOTA_PER_MINUTE_<R>`    | `20`    |                                |
    /// | `QUOTA_PER_HOUR_<R>`      | `600`   |                                |
    /// | `WEBHOOK_URL_<R>`         | —       | absent ⇒ no notifications      |
    /// | `CHECK_INTERVAL_SECS_<R>` | `3600`  |                                |
    /// | `CATALOG_API_URL`         | —       | required                       |
    /// | `LEGACY_API_URL`          | —       | absent ⇒ legacy source off     |
    /// | `CATALOG_PAGE_URL`        | —       | absent ⇒ page scrape off       |
    /// | `PAGE_SCRAPE_ENABLED`     | `true`  | kill switch for the scrape     |
    /// | `RESOLVER_CONCURRENCY`    | `4`     |                                |
    /// | `CACHE_TTL_SECS`          | `600`   |                                |
    /// | `BATCH_PARTITIONS`        | `1`     |                                |
    /// | `NOTIFY_BATCH_SIZE`       | `2`     |                                |
    /// | `NOTIFY_BATCH_PAUSE_MS`   | `2000`  |                                |
    /// | `HISTORY_RETENTION_DAYS`  | `90`    |                                |
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let api_url = std::env::var("CATALOG_API_URL").expect("CATALOG_API_URL must be set");
        let legacy_api_url = std::env::var("LEGACY_API_URL").ok();

        let page_scrape_enabled: bool = env_or("PAGE_SCRAPE_ENABLED", "true")
            .parse()
            .expect("PAGE_SCRAPE_ENABLED must be true or false");
        let page_url = if page_scrape_enabled {
            std::env::var("CATALOG_PAGE_URL").ok()
        } else {
            None
        };

        let region_names = env_or("REGIONS", "US");
        let regions: Vec<RegionSettings> = region_names
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(region_from_env)
            .collect();

        let config = Self {
            database_url,
            regions,
            api_url,
            legacy_api_url,
            page_url,
            resolver_concurrency: parse_env("RESOLVER_CONCURRENCY", "4"),
            cache_ttl: Duration::from_secs(parse_env("CACHE_TTL_SECS", "600")),
            batch_partitions: parse_env("BATCH_PARTITIONS", "1"),
            notify_batch_size: parse_env("NOTIFY_BATCH_SIZE", "2"),
            notify_batch_pause: Duration::from_millis(parse_env("NOTIFY_BATCH_PAUSE_MS", "2000")),
            history_retention_days: parse_env("HISTORY_RETENTION_DAYS", "90"),
        };

        if let Err(e) = config.validate() {
            panic!("Invalid monitor configuration: {e}");
        }
        config
    }

    /// Validate cross-field constraints. Fatal at startup, never later.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.regions.is_empty() {
            return Err(CoreError::Validation(
                "At least one region must be configured".to_string(),
            ));
        }
        for region in &self.regions {
            if region.quota.per_minute == 0 || region.quota.per_hour == 0 {
                return Err(CoreError::Validation(format!(
                    "Region '{}' has a zero quota ceiling",
                    region.name
                )));
            }
            if region.check_interval.is_zero() {
                return Err(CoreError::Validation(format!(
                    "Region '{}' has a zero check interval",
                    region.name
                )));
            }
        }
        if self.resolver_concurrency == 0 {
            return Err(CoreError::Validation(
                "RESOLVER_CONCURRENCY must be at least 1".to_string(),
            ));
        }
        if self.batch_partitions == 0 {
            return Err(CoreError::Validation(
                "BATCH_PARTITIONS must be at least 1".to_string(),
            ));
        }
        if self.history_retention_days <= 0 {
            return Err(CoreError::Validation(
                "HISTORY_RETENTION_DAYS must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Per-region quota map for the rate limiter.
    pub fn quotas(&self) -> HashMap<String, QuotaConfig> {
        self.regions
            .iter()
            .map(|r| (r.name.clone(), r.quota.clone()))
            .collect()
    }

    /// Per-region marketplace mapping for the resolver.
    pub fn region_refs(&self) -> HashMap<String, RegionRef> {
        self.regions
            .iter()
            .map(|r| (r.name.clone(), RegionRef::new(&r.name, &r.marketplace_id)))
            .collect()
    }

    /// Resolver chain configuration.
    pub fn resolver_config(&self) -> ResolverConfig {
        let mut config = ResolverConfig::new(&self.api_url);
        if let Some(url) = &self.legacy_api_url {
            config = config.with_legacy_api(url);
        }
        if let Some(url) = &self.page_url {
            config = config.with_page_scrape(url);
        }
        config
    }
}

/// Assemble one region's settings from its suffixed variables.
fn region_from_env(name: &str) -> RegionSettings {
    let marketplace_id = std::env::var(format!("MARKETPLACE_ID_{name}"))
        .unwrap_or_else(|_| panic!("MARKETPLACE_ID_{name} must be set"));

    RegionSettings {
        name: name.to_string(),
        marketplace_id,
        quota: QuotaConfig {
            per_minute: parse_env(&format!("QUOTA_PER_MINUTE_{name}"), "20"),
            per_hour: parse_env(&format!("QUOTA_PER_HOUR_{name}"), "600"),
        },
        webhook_url: std::env::var(format!("WEBHOOK_URL_{name}")).ok(),
        check_interval: Duration::from_secs(parse_env(
            &format!("CHECK_INTERVAL_SECS_{name}"),
            "3600",
        )),
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: &str) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env_or(key, default)
        .parse()
        .unwrap_or_else(|e| panic!("{key} is invalid: {e}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
