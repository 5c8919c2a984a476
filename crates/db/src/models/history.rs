//! Check history entity model.

use serde::Serialize;
use sqlx::FromRow;

use linkwatch_core::types::{DbId, Timestamp};

/// A row from the `link_check_records` table.
///
/// Append-only: one record per checked item per batch run, immutable once
/// written. All records of one run share a `batch_seq`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LinkCheckRecord {
    pub id: DbId,
    pub batch_seq: i64,
    pub code: String,
    pub region: String,
    pub status: String,
    pub parent_code: Option<String>,
    pub link_type: Option<String>,
    pub source: String,
    pub checked_at: Timestamp,
}
