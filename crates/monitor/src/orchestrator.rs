//! Check orchestration: cache → dedup → bounded executor → admission →
//! resolver chain, composed per code, per group, and per region batch.

use std::collections::HashMap;
use std::sync::Arc;

use sqlx::PgPool;

use linkwatch_catalog::{CheckResult, LinkResolver, RegionRef};
use linkwatch_core::check_status::{status_for_link, STATUS_ERROR};
use linkwatch_core::types::DbId;
use linkwatch_db::repositories::{GroupRepo, HistoryRepo, ItemRepo};

use crate::cache::{CacheConfig, CacheKey, ResultCache};
use crate::error::MonitorError;
use crate::executor::BoundedExecutor;
use crate::limiter::{Priority, RateLimiter, OP_CATALOG_LOOKUP};
use crate::report::{BrokenItem, GroupCheckOutcome, RegionBatchReport};
use crate::singleflight::Singleflight;

/// Admission cost of one resolver-chain run.
const CHECK_COST: u32 = 1;

/// Source tag recorded when a check failed before any source answered.
const SOURCE_NONE: &str = "none";

// ---------------------------------------------------------------------------
// Checker
// ---------------------------------------------------------------------------

/// The database-free core of the orchestrator: everything `check_one`
/// needs. Split out so the per-code path can be exercised without a
/// database.
pub struct Checker {
    resolver: Arc<LinkResolver>,
    limiter: Arc<RateLimiter>,
    cache: Arc<ResultCache>,
    singleflight: Singleflight<CacheKey, CheckResult>,
    executor: BoundedExecutor,
    regions: HashMap<String, RegionRef>,
}

impl Checker {
    /// Assemble the per-code check pipeline.
    ///
    /// `concurrency` bounds simultaneous resolver runs process-wide; zero is
    /// a configuration error.
    pub fn new(
        resolver: Arc<LinkResolver>,
        limiter: Arc<RateLimiter>,
        regions: HashMap<String, RegionRef>,
        cache_config: CacheConfig,
        concurrency: usize,
    ) -> Result<Self, MonitorError> {
        Ok(Self {
            resolver,
            limiter,
            cache: Arc::new(ResultCache::new(cache_config)),
            singleflight: Singleflight::new(),
            executor: BoundedExecutor::new(concurrency)?,
            regions,
        })
    }

    /// Check one `(code, region)` pair.
    ///
    /// Cache hits return immediately unless `force_refresh` is set; either
    /// way a fresh resolution repopulates the cache. Concurrent calls for
    /// the same key share one resolution.
    pub async fn check_one(
        &self,
        code: &str,
        region: &str,
        force_refresh: bool,
        priority: Priority,
    ) -> Result<CheckResult, MonitorError> {
        linkwatch_core::codes::validate_catalog_code(code)
            .map_err(|e| MonitorError::InvalidCode(e.to_string()))?;
        let region_ref = self
            .regions
            .get(region)
            .ok_or_else(|| MonitorError::UnknownRegion(region.to_string()))?
            .clone();

        if !force_refresh {
            if let Some(hit) = self.cache.get(code, region).await {
                tracing::debug!(code, region, "Check served from cache");
                return Ok(hit);
            }
        }

        // Resolve the budget before entering the singleflight so the shared
        // computation cannot fail: admission with cost 1 against a validated
        // quota always eventually succeeds.
        let budget = self.limiter.budget(region, OP_CATALOG_LOOKUP)?;

        let key = CacheKey::new(code, region);
        let resolver = Arc::clone(&self.resolver);
        let cache = Arc::clone(&self.cache);
        let executor = self.executor.clone();
        let owned_code = code.to_string();

        self.singleflight
            .run(key, move || async move {
                executor
                    .run(async move {
                        budget
                            .acquire(CHECK_COST, priority)
                            .await
                            .expect("cost 1 is within every validated quota ceiling");
                        let result = resolver.resolve(&owned_code, &region_ref).await;
                        cache.put(result.clone()).await;
                        result
                    })
                    .await
            })
            .await
            .ok_or_else(|| MonitorError::CheckAborted(format!("{code} ({region})")))
    }

    /// Drop the cached result for one `(code, region)`.
    pub async fn invalidate(&self, code: &str, region: &str) {
        self.cache.invalidate(code, region).await;
    }
}

// ---------------------------------------------------------------------------
// CheckOrchestrator
// ---------------------------------------------------------------------------

/// [`Checker`] plus persistence: group scans, batch runs, history records.
pub struct CheckOrchestrator {
    checker: Checker,
    pool: PgPool,
}

impl CheckOrchestrator {
    pub fn new(checker: Checker, pool: PgPool) -> Self {
        Self { checker, pool }
    }

    /// The database-free per-code pipeline.
    pub fn checker(&self) -> &Checker {
        &self.checker
    }

    /// See [`Checker::check_one`].
    pub async fn check_one(
        &self,
        code: &str,
        region: &str,
        force_refresh: bool,
        priority: Priority,
    ) -> Result<CheckResult, MonitorError> {
        self.checker.check_one(code, region, force_refresh, priority).await
    }

    /// Check every member of a variant group and derive the group flag.
    ///
    /// One failing item never aborts the scan: it is recorded as broken
    /// (with an error status) and the scan continues. Status writes are
    /// best-effort; write failures are logged.
    pub async fn check_group(
        &self,
        group_id: DbId,
        force_refresh: bool,
    ) -> Result<GroupCheckOutcome, MonitorError> {
        let group = GroupRepo::find_by_id(&self.pool, group_id)
            .await?
            .ok_or(MonitorError::GroupNotFound(group_id))?;
        let items = ItemRepo::list_for_group(&self.pool, group_id).await?;

        let checks = items.iter().map(|item| {
            self.checker
                .check_one(&item.code, &item.region, force_refresh, Priority::Interactive)
        });
        let results = futures::future::join_all(checks).await;

        let mut outcome = GroupCheckOutcome {
            group_id,
            total: items.len(),
            broken_count: 0,
            error_count: 0,
            is_broken: false,
            broken_items: Vec::new(),
        };

        for (item, result) in items.iter().zip(results) {
            let is_broken = match result {
                Ok(result) => !result.has_link,
                Err(e) => {
                    tracing::warn!(
                        code = %item.code,
                        region = %item.region,
                        error = %e,
                        "Item check failed, recording as broken"
                    );
                    outcome.error_count += 1;
                    true
                }
            };

            if let Err(e) = ItemRepo::set_check_status(&self.pool, item.id, is_broken).await {
                tracing::warn!(item_id = item.id, error = %e, "Item status write failed");
            }

            if is_broken {
                outcome.broken_count += 1;
                outcome.broken_items.push(BrokenItem {
                    code: item.code.clone(),
                    brand: item.brand.clone(),
                    group_name: group.name.clone(),
                });
            }
        }

        outcome.is_broken = outcome.broken_count > 0;
        if let Err(e) = GroupRepo::set_broken(&self.pool, group_id, outcome.is_broken).await {
            tracing::warn!(group_id, error = %e, "Group flag write failed");
        }

        // Flush cached results so reads after the scan see fresh state.
        for item in &items {
            self.checker.invalidate(&item.code, &item.region).await;
        }

        Ok(outcome)
    }

    /// Run one scheduled batch over all items of a region.
    ///
    /// Allocates a batch sequence, checks every item (optionally in
    /// sequential partitions to smooth quota use), persists per-item status
    /// and one history record per item, and re-derives group flags. History
    /// and status writes are best-effort relative to the returned report.
    pub async fn run_region_batch(
        &self,
        region: &str,
        force_refresh: bool,
        partitions: usize,
    ) -> Result<RegionBatchReport, MonitorError> {
        let started = std::time::Instant::now();
        let batch_seq = HistoryRepo::next_batch_seq(&self.pool).await?;

        let items = ItemRepo::list_for_region(&self.pool, region).await?;
        let groups = GroupRepo::list_for_region(&self.pool, region).await?;
        let group_meta: HashMap<DbId, (String, bool)> = groups
            .iter()
            .map(|g| (g.id, (g.name.clone(), g.notify_enabled)))
            .collect();

        let mut report = RegionBatchReport {
            region: region.to_string(),
            batch_seq,
            total: items.len(),
            broken_items: Vec::new(),
            error_count: 0,
            elapsed: Default::default(),
        };

        let chunk_size = items.len().div_ceil(partitions.max(1)).max(1);
        for chunk in items.chunks(chunk_size) {
            let checks = chunk.iter().map(|item| {
                self.checker
                    .check_one(&item.code, &item.region, force_refresh, Priority::Batch)
            });
            let results = futures::future::join_all(checks).await;

            for (item, result) in chunk.iter().zip(results) {
                let (status, is_broken, parent_code, source) = match &result {
                    Ok(result) => (
                        status_for_link(result.has_link),
                        !result.has_link,
                        result.parent_code.clone(),
                        result.source.as_str(),
                    ),
                    Err(e) => {
                        tracing::warn!(
                            code = %item.code,
                            region = %item.region,
                            error = %e,
                            "Item check failed, recording as error"
                        );
                        report.error_count += 1;
                        (STATUS_ERROR, true, None, SOURCE_NONE)
                    }
                };

                if let Err(e) = ItemRepo::set_check_status(&self.pool, item.id, is_broken).await {
                    tracing::warn!(item_id = item.id, error = %e, "Item status write failed");
                }

                if let Err(e) = HistoryRepo::append(
                    &self.pool,
                    batch_seq,
                    &item.code,
                    &item.region,
                    status,
                    parent_code.as_deref(),
                    item.link_type.as_deref(),
                    source,
                )
                .await
                {
                    tracing::warn!(
                        code = %item.code,
                        batch_seq,
                        error = %e,
                        "History record write failed"
                    );
                }

                // Broken items enter the report only when their group has
                // notifications enabled; status and history writes above are
                // unaffected by the notification scope.
                if is_broken {
                    let (group_name, notify_enabled) = group_meta
                        .get(&item.group_id)
                        .cloned()
                        .unwrap_or_default();
                    if notify_enabled {
                        report.broken_items.push(BrokenItem {
                            code: item.code.clone(),
                            brand: item.brand.clone(),
                            group_name,
                        });
                    }
                }
            }
        }

        for group in &groups {
            if let Err(e) = GroupRepo::recompute_broken(&self.pool, group.id).await {
                tracing::warn!(group_id = group.id, error = %e, "Group flag recompute failed");
            }
        }

        for item in &items {
            self.checker.invalidate(&item.code, &item.region).await;
        }

        report.elapsed = started.elapsed();
        tracing::info!(
            region,
            batch_seq,
            total = report.total,
            broken = report.broken_count(),
            errors = report.error_count,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Region batch completed"
        );

        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
