//! Per-region schedule loops and notification funneling.
//!
//! One loop per region triggers batch runs on that region's cadence. The
//! loop body runs the batch inline, so a region can never overlap itself;
//! ticks that fire mid-run are skipped. Completed runs enqueue their
//! summary onto a shared channel drained by the dispatch loop, which
//! batches cross-region deliveries.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use linkwatch_monitor::CheckOrchestrator;
use linkwatch_notify::{Dispatcher, RegionNotification, RegionSummary};

use crate::config::RegionSettings;

/// Buffered notifications between region loops and the dispatch loop.
const NOTIFY_QUEUE_CAPACITY: usize = 64;

/// Drives scheduled batch runs and notification dispatch.
pub struct ScheduleCoordinator {
    orchestrator: Arc<CheckOrchestrator>,
    dispatcher: Arc<Dispatcher>,
    batch_partitions: usize,
}

impl ScheduleCoordinator {
    pub fn new(
        orchestrator: Arc<CheckOrchestrator>,
        dispatcher: Arc<Dispatcher>,
        batch_partitions: usize,
    ) -> Self {
        Self {
            orchestrator,
            dispatcher,
            batch_partitions,
        }
    }

    /// Create the notification channel shared by all loops.
    pub fn notification_channel() -> (
        mpsc::Sender<RegionNotification>,
        mpsc::Receiver<RegionNotification>,
    ) {
        mpsc::channel(NOTIFY_QUEUE_CAPACITY)
    }

    /// Run one region's schedule until cancelled.
    pub async fn run_region_loop(
        &self,
        region: RegionSettings,
        queue: mpsc::Sender<RegionNotification>,
        cancel: CancellationToken,
    ) {
        let mut interval = tokio::time::interval(region.check_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            region = %region.name,
            interval_secs = region.check_interval.as_secs(),
            notify = region.webhook_url.is_some(),
            "Region schedule started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(region = %region.name, "Region schedule cancelled");
                    break;
                }
                _ = interval.tick() => {
                    self.run_once(&region, &queue).await;
                }
            }
        }
    }

    /// Execute one batch run and enqueue its notification.
    async fn run_once(&self, region: &RegionSettings, queue: &mpsc::Sender<RegionNotification>) {
        let report = match self
            .orchestrator
            .run_region_batch(&region.name, false, self.batch_partitions)
            .await
        {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(region = %region.name, error = %e, "Region batch failed");
                return;
            }
        };

        let Some(url) = &region.webhook_url else {
            tracing::debug!(region = %region.name, "No webhook configured, skipping notification");
            return;
        };

        let notification = RegionNotification {
            url: url.clone(),
            summary: RegionSummary::from_report(&report),
        };
        if queue.send(notification).await.is_err() {
            tracing::warn!(region = %region.name, "Notification queue closed, summary dropped");
        }
    }

    /// Drain the notification queue until cancelled.
    ///
    /// Everything queued at wake-up time goes into one dispatcher cycle, so
    /// regions completing together share the dispatcher's batch throttling
    /// instead of racing each other to the webhook provider.
    pub async fn run_dispatch_loop(
        &self,
        mut queue: mpsc::Receiver<RegionNotification>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Dispatch loop cancelled");
                    break;
                }
                first = queue.recv() => {
                    let Some(first) = first else { break };
                    let mut pending = vec![first];
                    while let Ok(more) = queue.try_recv() {
                        pending.push(more);
                    }

                    let count = pending.len();
                    let stats = self.dispatcher.dispatch_all(pending).await;
                    tracing::info!(
                        queued = count,
                        sent = stats.sent,
                        failed = stats.failed,
                        "Dispatch cycle complete"
                    );
                }
            }
        }
    }
}
