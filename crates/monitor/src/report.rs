//! Aggregated outcomes of group and region-batch checks.

use std::time::Duration;

use serde::Serialize;

use linkwatch_core::types::DbId;

/// One broken item, carrying what the notification message shows.
#[derive(Debug, Clone, Serialize)]
pub struct BrokenItem {
    pub code: String,
    pub brand: String,
    pub group_name: String,
}

/// Result of checking one variant group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupCheckOutcome {
    pub group_id: DbId,
    pub total: usize,
    pub broken_count: usize,
    /// Items whose check failed to execute; counted into `broken_count` too.
    pub error_count: usize,
    pub is_broken: bool,
    pub broken_items: Vec<BrokenItem>,
}

/// Result of one scheduled batch run for a region.
#[derive(Debug, Clone, Serialize)]
pub struct RegionBatchReport {
    pub region: String,
    pub batch_seq: i64,
    pub total: usize,
    pub broken_items: Vec<BrokenItem>,
    pub error_count: usize,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RegionBatchReport {
    pub fn broken_count(&self) -> usize {
        self.broken_items.len()
    }
}
