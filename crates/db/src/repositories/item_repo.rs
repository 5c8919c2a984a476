//! Repository for the `monitored_items` table.

use sqlx::PgPool;

use linkwatch_core::types::DbId;

use crate::models::MonitoredItem;

// ---------------------------------------------------------------------------
// Column list
// ---------------------------------------------------------------------------

const ITEM_COLUMNS: &str = "\
    id, group_id, code, region, brand, title, link_type, is_broken, \
    last_check_time, created_at, updated_at";

/// Read and narrow-write operations on monitored items.
///
/// Creation and editing of items belongs to the management layer; the
/// monitoring core only reads rows and updates check-status fields.
pub struct ItemRepo;

impl ItemRepo {
    /// Find an item by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<MonitoredItem>, sqlx::Error> {
        let query = format!("SELECT {ITEM_COLUMNS} FROM monitored_items WHERE id = $1");
        sqlx::query_as::<_, MonitoredItem>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all items belonging to a variant group, oldest first.
    pub async fn list_for_group(
        pool: &PgPool,
        group_id: DbId,
    ) -> Result<Vec<MonitoredItem>, sqlx::Error> {
        let query = format!(
            "SELECT {ITEM_COLUMNS} FROM monitored_items \
             WHERE group_id = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, MonitoredItem>(&query)
            .bind(group_id)
            .fetch_all(pool)
            .await
    }

    /// List all items in a region, oldest first.
    pub async fn list_for_region(
        pool: &PgPool,
        region: &str,
    ) -> Result<Vec<MonitoredItem>, sqlx::Error> {
        let query = format!(
            "SELECT {ITEM_COLUMNS} FROM monitored_items \
             WHERE region = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, MonitoredItem>(&query)
            .bind(region)
            .fetch_all(pool)
            .await
    }

    /// Record the outcome of a check: broken flag plus check timestamp.
    pub async fn set_check_status(
        pool: &PgPool,
        id: DbId,
        is_broken: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE monitored_items SET \
                 is_broken = $2, \
                 last_check_time = NOW(), \
                 updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(is_broken)
        .execute(pool)
        .await?;
        Ok(())
    }
}
