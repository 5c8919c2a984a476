//! Repository for the `link_check_records` table and the batch sequence.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::LinkCheckRecord;

// ---------------------------------------------------------------------------
// Column list
// ---------------------------------------------------------------------------

const RECORD_COLUMNS: &str = "\
    id, batch_seq, code, region, status, parent_code, link_type, source, \
    checked_at";

/// Append-only check history plus batch sequence allocation.
pub struct HistoryRepo;

impl HistoryRepo {
    /// Obtain the next batch sequence number.
    ///
    /// Backed by the `link_check_batch_seq` database sequence: values are
    /// strictly increasing, never reused, and safe under concurrent callers
    /// and process restarts.
    pub async fn next_batch_seq(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT nextval('link_check_batch_seq')")
            .fetch_one(pool)
            .await
    }

    /// Append one immutable history record.
    #[allow(clippy::too_many_arguments)]
    pub async fn append(
        pool: &PgPool,
        batch_seq: i64,
        code: &str,
        region: &str,
        status: &str,
        parent_code: Option<&str>,
        link_type: Option<&str>,
        source: &str,
    ) -> Result<LinkCheckRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO link_check_records \
                 (batch_seq, code, region, status, parent_code, link_type, source) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {RECORD_COLUMNS}"
        );
        sqlx::query_as::<_, LinkCheckRecord>(&query)
            .bind(batch_seq)
            .bind(code)
            .bind(region)
            .bind(status)
            .bind(parent_code)
            .bind(link_type)
            .bind(source)
            .fetch_one(pool)
            .await
    }

    /// List all records written under one batch sequence, oldest first.
    pub async fn list_for_batch(
        pool: &PgPool,
        batch_seq: i64,
    ) -> Result<Vec<LinkCheckRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {RECORD_COLUMNS} FROM link_check_records \
             WHERE batch_seq = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, LinkCheckRecord>(&query)
            .bind(batch_seq)
            .fetch_all(pool)
            .await
    }

    /// Delete records older than the cutoff. Returns the number deleted.
    pub async fn delete_older_than(
        pool: &PgPool,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM link_check_records WHERE checked_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
