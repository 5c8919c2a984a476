//! Monitored item and variant group entity models.

use serde::Serialize;
use sqlx::FromRow;

use linkwatch_core::types::{DbId, Timestamp};

/// A row from the `monitored_items` table.
///
/// Items are created and edited by the management layer; the monitoring core
/// reads identity fields and writes only `is_broken` / `last_check_time`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MonitoredItem {
    pub id: DbId,
    pub group_id: DbId,
    pub code: String,
    pub region: String,
    pub brand: String,
    pub title: String,
    pub link_type: Option<String>,
    pub is_broken: bool,
    pub last_check_time: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `variant_groups` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct VariantGroup {
    pub id: DbId,
    pub name: String,
    pub region: String,
    pub notify_enabled: bool,
    pub is_broken: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
