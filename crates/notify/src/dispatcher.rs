//! Multi-region dispatch with egress throttling.
//!
//! Regions finishing their batch runs near-simultaneously (the common case
//! right after startup) would otherwise burst the webhook provider.
//! [`Dispatcher::dispatch_all`] sends in small batches with a pause in
//! between.

use std::time::Duration;

use crate::message::RegionSummary;
use crate::webhook::{WebhookError, WebhookNotifier};

/// Default number of regions delivered per batch.
const DEFAULT_BATCH_SIZE: usize = 2;

/// Default pause between delivery batches.
const DEFAULT_BATCH_PAUSE: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One pending delivery: a summary and its region's webhook URL.
#[derive(Debug, Clone)]
pub struct RegionNotification {
    pub url: String,
    pub summary: RegionSummary,
}

/// Outcome counters for one dispatch cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub sent: usize,
    pub failed: usize,
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Sends region notifications in throttled batches.
pub struct Dispatcher {
    notifier: WebhookNotifier,
    batch_size: usize,
    batch_pause: Duration,
}

impl Dispatcher {
    pub fn new(notifier: WebhookNotifier) -> Self {
        Self {
            notifier,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_pause: DEFAULT_BATCH_PAUSE,
        }
    }

    /// Override the per-batch region count. Zero is clamped to one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Override the pause between batches.
    pub fn with_batch_pause(mut self, pause: Duration) -> Self {
        self.batch_pause = pause;
        self
    }

    /// Deliver all notifications, `batch_size` at a time, pausing between
    /// batches.
    ///
    /// Failures are logged and counted, never propagated: a region whose
    /// webhook is down must not block the other regions' messages.
    pub async fn dispatch_all(&self, notifications: Vec<RegionNotification>) -> DispatchStats {
        let mut stats = DispatchStats::default();
        let total_batches = notifications.len().div_ceil(self.batch_size.max(1));

        for (index, batch) in notifications.chunks(self.batch_size.max(1)).enumerate() {
            for notification in batch {
                match self
                    .notifier
                    .send(&notification.url, &notification.summary)
                    .await
                {
                    Ok(()) => {
                        stats.sent += 1;
                        tracing::info!(
                            region = %notification.summary.region,
                            batch = %notification.summary.batch,
                            broken = notification.summary.broken_count,
                            "Region summary delivered"
                        );
                    }
                    Err(WebhookError::RateLimited { attempts }) => {
                        stats.failed += 1;
                        tracing::error!(
                            region = %notification.summary.region,
                            attempts,
                            "Region summary dropped: webhook throttling persisted"
                        );
                    }
                    Err(e) => {
                        stats.failed += 1;
                        tracing::error!(
                            region = %notification.summary.region,
                            error = %e,
                            "Region summary delivery failed"
                        );
                    }
                }
            }

            if index + 1 < total_batches {
                tokio::time::sleep(self.batch_pause).await;
            }
        }

        stats
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use linkwatch_monitor::RegionBatchReport;

    use super::*;

    fn notification(region: &str) -> RegionNotification {
        let report = RegionBatchReport {
            region: region.to_string(),
            batch_seq: 1,
            total: 0,
            broken_items: vec![],
            error_count: 0,
            elapsed: Default::default(),
        };
        RegionNotification {
            // Nothing listens here: connection is refused immediately.
            url: "http://127.0.0.1:9".to_string(),
            summary: RegionSummary::from_report(&report),
        }
    }

    #[tokio::test]
    async fn empty_dispatch_is_a_no_op() {
        let dispatcher = Dispatcher::new(WebhookNotifier::new());
        let stats = dispatcher.dispatch_all(vec![]).await;
        assert_eq!(stats, DispatchStats::default());
    }

    #[tokio::test]
    async fn failures_are_counted_not_propagated() {
        let dispatcher = Dispatcher::new(WebhookNotifier::new())
            .with_batch_size(2)
            .with_batch_pause(Duration::from_millis(1));

        let stats = dispatcher
            .dispatch_all(vec![notification("US"), notification("DE"), notification("UK")])
            .await;

        assert_eq!(stats.sent, 0);
        assert_eq!(stats.failed, 3);
    }

    #[test]
    fn zero_batch_size_is_clamped() {
        let dispatcher = Dispatcher::new(WebhookNotifier::new()).with_batch_size(0);
        assert_eq!(dispatcher.batch_size, 1);
    }
}
