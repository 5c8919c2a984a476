//! Repository for the `variant_groups` table.

use sqlx::PgPool;

use linkwatch_core::types::DbId;

use crate::models::VariantGroup;

// ---------------------------------------------------------------------------
// Column list
// ---------------------------------------------------------------------------

const GROUP_COLUMNS: &str = "\
    id, name, region, notify_enabled, is_broken, created_at, updated_at";

/// Read and derived-flag operations on variant groups.
pub struct GroupRepo;

impl GroupRepo {
    /// Find a group by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<VariantGroup>, sqlx::Error> {
        let query = format!("SELECT {GROUP_COLUMNS} FROM variant_groups WHERE id = $1");
        sqlx::query_as::<_, VariantGroup>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all groups in a region, oldest first.
    pub async fn list_for_region(
        pool: &PgPool,
        region: &str,
    ) -> Result<Vec<VariantGroup>, sqlx::Error> {
        let query = format!(
            "SELECT {GROUP_COLUMNS} FROM variant_groups \
             WHERE region = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, VariantGroup>(&query)
            .bind(region)
            .fetch_all(pool)
            .await
    }

    /// Write the derived broken flag for a group.
    pub async fn set_broken(pool: &PgPool, id: DbId, is_broken: bool) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE variant_groups SET is_broken = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(is_broken)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Recompute the broken flag from member rows in SQL and persist it.
    ///
    /// Returns the derived value. Used by consistency checks when item
    /// statuses were written outside a full group scan.
    pub async fn recompute_broken(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let is_broken: bool = sqlx::query_scalar(
            "SELECT EXISTS (\
                 SELECT 1 FROM monitored_items \
                 WHERE group_id = $1 AND is_broken = TRUE\
             )",
        )
        .bind(id)
        .fetch_one(pool)
        .await?;

        Self::set_broken(pool, id, is_broken).await?;
        Ok(is_broken)
    }
}
