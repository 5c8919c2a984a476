//! Bounded concurrency over resolver invocations.
//!
//! One process-wide cap on simultaneous resolver calls, independent of how
//! many codes a caller wants checked at once. Excess submissions queue in
//! the semaphore's FIFO order.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::error::MonitorError;

/// Runs tasks with at most N running at once.
#[derive(Clone)]
pub struct BoundedExecutor {
    semaphore: Arc<Semaphore>,
}

impl BoundedExecutor {
    /// Create an executor with `limit` concurrent slots.
    ///
    /// A zero limit would deadlock every submission and is rejected as a
    /// configuration error.
    pub fn new(limit: usize) -> Result<Self, MonitorError> {
        if limit == 0 {
            return Err(MonitorError::Config(
                "Executor concurrency limit must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(limit)),
        })
    }

    /// Run a task once a slot is free. The slot is held for the task's
    /// entire duration, including its own suspension points.
    pub async fn run<F, T>(&self, task: F) -> T
    where
        F: Future<Output = T>,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("executor semaphore is never closed");
        task.await
    }

    /// Currently free slots. Exposed for tests and diagnostics.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[test]
    fn zero_limit_rejected() {
        assert!(BoundedExecutor::new(0).is_err());
    }

    #[tokio::test]
    async fn runs_tasks_and_returns_results() {
        let executor = BoundedExecutor::new(2).unwrap();
        let result = executor.run(async { 41 + 1 }).await;
        assert_eq!(result, 42);
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_limit() {
        let executor = BoundedExecutor::new(3).unwrap();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let executor = executor.clone();
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                executor
                    .run(async move {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        running.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 3, "peak exceeded limit");
    }
}
