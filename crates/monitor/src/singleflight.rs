//! Singleflight deduplication of concurrent identical checks.
//!
//! At most one resolution runs per key at any instant; every concurrent
//! caller for that key awaits the same in-flight computation. The
//! computation is spawned onto the runtime, so a caller that goes away
//! mid-flight never kills the result for the waiters that remain.
//!
//! Force-refresh note: a forced check that finds an in-flight computation
//! for its key joins it. The in-flight computation is itself a live
//! resolution — it serves no cached data — so joining protects the upstream
//! quota at no freshness cost. Force-refresh bypasses the cache only.

use std::collections::VecDeque;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use tokio::sync::broadcast;

/// Default bound on concurrently tracked keys.
///
/// Exceeding it evicts the oldest tracked key: its computation still runs
/// and its existing waiters still get their result, but new callers for
/// that key start a fresh computation. This only matters under pathological
/// fan-out.
const DEFAULT_MAX_TRACKED: usize = 10_000;

// ---------------------------------------------------------------------------
// Singleflight
// ---------------------------------------------------------------------------

/// Collapses concurrent computations for the same key into one.
pub struct Singleflight<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + 'static,
{
    in_flight: Arc<DashMap<K, broadcast::Sender<T>>>,
    insertion_order: Arc<Mutex<VecDeque<K>>>,
    max_tracked: usize,
}

impl<K, T> Singleflight<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::with_max_tracked(DEFAULT_MAX_TRACKED)
    }

    pub fn with_max_tracked(max_tracked: usize) -> Self {
        Self {
            in_flight: Arc::new(DashMap::new()),
            insertion_order: Arc::new(Mutex::new(VecDeque::new())),
            max_tracked,
        }
    }

    /// Run `make_task`'s future for `key`, or join the one already running.
    ///
    /// The winning caller's future is spawned onto the runtime and runs to
    /// completion regardless of caller cancellation. Returns `None` only if
    /// the computation aborted without a result (panic inside the task).
    ///
    /// `make_task` is only invoked when this caller wins the race.
    pub async fn run<F, Fut>(&self, key: K, make_task: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        use dashmap::mapref::entry::Entry;

        let mut rx = match self.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => entry.get().subscribe(),
            Entry::Vacant(entry) => {
                let (tx, rx) = broadcast::channel(1);
                entry.insert(tx.clone());
                self.track_insertion(key.clone());

                let task = make_task();
                let map = Arc::clone(&self.in_flight);
                tokio::spawn(async move {
                    // Remove-before-send: entry removal on drop guarantees a
                    // caller arriving after completion starts fresh instead
                    // of subscribing to a channel that already fired.
                    let guard = CompletionGuard { map, key };
                    let result = task.await;
                    drop(guard);
                    let _ = tx.send(result);
                });

                rx
            }
        };

        rx.recv().await.ok()
    }

    /// Number of keys currently tracked. Exposed for tests.
    pub fn tracked(&self) -> usize {
        self.in_flight.len()
    }

    /// Record insertion order and evict the oldest key over the bound.
    fn track_insertion(&self, key: K) {
        let evicted = {
            let mut order = self.insertion_order.lock().expect("order lock poisoned");
            order.push_back(key);
            if order.len() > self.max_tracked {
                order.pop_front()
            } else {
                None
            }
        };
        if let Some(old) = evicted {
            self.in_flight.remove(&old);
        }
    }
}

impl<K, T> Default for Singleflight<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Removes the in-flight entry when the computation finishes or panics.
struct CompletionGuard<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    map: Arc<DashMap<K, broadcast::Sender<T>>>,
    key: K,
}

impl<K, T> Drop for CompletionGuard<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.map.remove(&self.key);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn concurrent_callers_share_one_computation() {
        let sf = Arc::new(Singleflight::<String, u32>::new());
        let invocations = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let sf = Arc::clone(&sf);
            let invocations = Arc::clone(&invocations);
            handles.push(tokio::spawn(async move {
                sf.run("key".to_string(), move || async move {
                    invocations.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    7u32
                })
                .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Some(7));
        }
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn sequential_calls_each_run_fresh() {
        let sf = Singleflight::<String, u32>::new();
        let invocations = Arc::new(AtomicU32::new(0));

        for _ in 0..3 {
            let invocations = Arc::clone(&invocations);
            sf.run("key".to_string(), move || async move {
                invocations.fetch_add(1, Ordering::SeqCst)
            })
            .await;
        }

        assert_eq!(invocations.load(Ordering::SeqCst), 3);
        assert_eq!(sf.tracked(), 0);
    }

    #[tokio::test]
    async fn distinct_keys_do_not_dedup() {
        let sf = Arc::new(Singleflight::<String, u32>::new());
        let invocations = Arc::new(AtomicU32::new(0));

        let a = {
            let invocations = Arc::clone(&invocations);
            sf.run("a".to_string(), move || async move {
                invocations.fetch_add(1, Ordering::SeqCst);
                1u32
            })
        };
        let b = {
            let invocations = Arc::clone(&invocations);
            sf.run("b".to_string(), move || async move {
                invocations.fetch_add(1, Ordering::SeqCst);
                2u32
            })
        };

        let (a, b) = tokio::join!(a, b);
        assert_eq!((a, b), (Some(1), Some(2)));
        assert_eq!(invocations.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn computation_survives_caller_cancellation() {
        let sf = Arc::new(Singleflight::<String, u32>::new());
        let invocations = Arc::new(AtomicU32::new(0));

        // First caller starts the computation, then is dropped mid-flight.
        let leader = {
            let sf = Arc::clone(&sf);
            let invocations = Arc::clone(&invocations);
            tokio::spawn(async move {
                sf.run("key".to_string(), move || async move {
                    invocations.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    9u32
                })
                .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        leader.abort();

        // A follower attached after the leader still gets the result, and
        // no second computation runs.
        let result = sf
            .run("key".to_string(), || async move { unreachable!("joined in-flight") })
            .await;
        assert_eq!(result, Some(9));
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn eviction_bounds_tracked_keys() {
        let sf = Arc::new(Singleflight::<u32, u32>::with_max_tracked(4));

        let mut handles = Vec::new();
        for key in 0..8u32 {
            let sf = Arc::clone(&sf);
            handles.push(tokio::spawn(async move {
                sf.run(key, move || async move {
                    tokio::time::sleep(Duration::from_millis(40)).await;
                    key
                })
                .await
            }));
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(sf.tracked() <= 4, "tracked keys exceed the bound");

        for handle in handles {
            // Evicted keys still produce their result for attached waiters.
            assert!(handle.await.unwrap().is_some());
        }
    }
}
