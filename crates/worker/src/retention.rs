//! Periodic pruning of old check history.
//!
//! Spawned as a background task; deletes `link_check_records` rows older
//! than the configured retention period on a fixed interval.

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use linkwatch_db::repositories::HistoryRepo;
use linkwatch_db::DbPool;

/// How often the cleanup job runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

/// Run the history retention loop until cancelled.
pub async fn run(pool: DbPool, retention_days: i64, cancel: CancellationToken) {
    tracing::info!(
        retention_days,
        interval_secs = CLEANUP_INTERVAL.as_secs(),
        "History retention job started"
    );

    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("History retention job stopping");
                break;
            }
            _ = interval.tick() => {
                let cutoff = Utc::now() - chrono::Duration::days(retention_days);
                match HistoryRepo::delete_older_than(&pool, cutoff).await {
                    Ok(deleted) => {
                        if deleted > 0 {
                            tracing::info!(deleted, "History retention: purged old records");
                        } else {
                            tracing::debug!("History retention: no records to purge");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "History retention: cleanup failed");
                    }
                }
            }
        }
    }
}
