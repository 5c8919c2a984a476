//! Monitoring worker: wires configuration, database, resolver chain,
//! orchestrator, and dispatcher together, then runs the per-region
//! schedules until interrupted.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use linkwatch_catalog::LinkResolver;
use linkwatch_monitor::cache::CacheConfig;
use linkwatch_monitor::{CheckOrchestrator, Checker, RateLimiter};
use linkwatch_notify::{Dispatcher, WebhookNotifier};

mod config;
mod coordinator;
mod retention;

use config::MonitorConfig;
use coordinator::ScheduleCoordinator;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "linkwatch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = MonitorConfig::from_env();
    tracing::info!(
        regions = config.regions.len(),
        concurrency = config.resolver_concurrency,
        "Loaded monitor configuration"
    );

    // --- Database ---
    let pool = linkwatch_db::create_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    linkwatch_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    linkwatch_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Check pipeline ---
    let limiter = Arc::new(RateLimiter::new(config.quotas()).expect("Invalid quota configuration"));
    let resolver = Arc::new(LinkResolver::from_config(&config.resolver_config()));
    let checker = Checker::new(
        resolver,
        limiter,
        config.region_refs(),
        CacheConfig::default().with_ttl(config.cache_ttl),
        config.resolver_concurrency,
    )
    .expect("Invalid executor configuration");
    let orchestrator = Arc::new(CheckOrchestrator::new(checker, pool.clone()));

    // --- Notification dispatch ---
    let dispatcher = Arc::new(
        Dispatcher::new(WebhookNotifier::new())
            .with_batch_size(config.notify_batch_size)
            .with_batch_pause(config.notify_batch_pause),
    );

    // --- Schedules ---
    let coordinator = Arc::new(ScheduleCoordinator::new(
        orchestrator,
        dispatcher,
        config.batch_partitions,
    ));
    let cancel = CancellationToken::new();
    let (notify_tx, notify_rx) = ScheduleCoordinator::notification_channel();

    let mut tasks = Vec::new();

    {
        let coordinator = Arc::clone(&coordinator);
        let cancel = cancel.clone();
        tasks.push(tokio::spawn(async move {
            coordinator.run_dispatch_loop(notify_rx, cancel).await;
        }));
    }

    for region in config.regions.clone() {
        let coordinator = Arc::clone(&coordinator);
        let queue = notify_tx.clone();
        let cancel = cancel.clone();
        tasks.push(tokio::spawn(async move {
            coordinator.run_region_loop(region, queue, cancel).await;
        }));
    }
    // The dispatch loop exits when every sender is gone; drop the original.
    drop(notify_tx);

    tasks.push(tokio::spawn(retention::run(
        pool.clone(),
        config.history_retention_days,
        cancel.clone(),
    )));

    tracing::info!("Monitoring worker started");

    // --- Shutdown ---
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");
    tracing::info!("Shutdown signal received, stopping schedules");
    cancel.cancel();

    for task in tasks {
        let _ = task.await;
    }
    tracing::info!("Monitoring worker stopped");
}
