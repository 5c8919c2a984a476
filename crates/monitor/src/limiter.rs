//! Per-region, per-operation admission control.
//!
//! Each `(region, operation)` pair owns a [`RateBudget`]: a dual sliding
//! window (per-minute and per-hour ceilings) plus a two-class waiter queue.
//! Interactive callers outrank batch callers; within a class, admission is
//! FIFO. A caller with no tokens available suspends — no polling — and a
//! cancelled caller leaves the queue immediately via its RAII ticket.
//!
//! The budget map and each budget's state are the only mutable state here,
//! and both sit behind a mutex; no other component touches them.

use std::collections::{HashMap, VecDeque};
use std::pin::pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

use crate::error::MonitorError;

/// Operation key for resolver-chain catalog lookups.
pub const OP_CATALOG_LOOKUP: &str = "catalog_lookup";

/// The short admission window.
const MINUTE_WINDOW: Duration = Duration::from_secs(60);

/// The long admission window.
const HOUR_WINDOW: Duration = Duration::from_secs(3600);

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Admission class. Interactive (operator-triggered) checks outrank
/// scheduled batch checks; both draw from the same budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Interactive,
    Batch,
}

// ---------------------------------------------------------------------------
// QuotaConfig
// ---------------------------------------------------------------------------

/// Per-region admission ceilings.
#[derive(Debug, Clone)]
pub struct QuotaConfig {
    pub per_minute: u32,
    pub per_hour: u32,
}

impl QuotaConfig {
    fn validate(&self, region: &str) -> Result<(), MonitorError> {
        if self.per_minute == 0 || self.per_hour == 0 {
            return Err(MonitorError::Config(format!(
                "Quota for region '{region}' must be positive \
                 (per_minute={}, per_hour={})",
                self.per_minute, self.per_hour
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RateBudget
// ---------------------------------------------------------------------------

/// A queued waiter's place in line.
struct Ticket<'a> {
    budget: &'a RateBudget,
    id: u64,
    priority: Priority,
}

impl Drop for Ticket<'_> {
    fn drop(&mut self) {
        // Idempotent: admission already removed the id on the success path.
        // A cancelled waiter may have been the head of the line, so wake the
        // rest for a re-check.
        let mut state = self.budget.state.lock().expect("budget lock poisoned");
        state.remove(self.id, self.priority);
        drop(state);
        self.budget.notify.notify_waiters();
    }
}

struct BudgetState {
    /// Past admissions as `(instant, cost)`, oldest first, pruned past the
    /// hour window.
    admissions: VecDeque<(Instant, u32)>,
    interactive: VecDeque<u64>,
    batch: VecDeque<u64>,
    next_ticket: u64,
}

impl BudgetState {
    fn new() -> Self {
        Self {
            admissions: VecDeque::new(),
            interactive: VecDeque::new(),
            batch: VecDeque::new(),
            next_ticket: 0,
        }
    }

    fn prune(&mut self, now: Instant) {
        while let Some((t, _)) = self.admissions.front() {
            if now.duration_since(*t) >= HOUR_WINDOW {
                self.admissions.pop_front();
            } else {
                break;
            }
        }
    }

    fn used_within(&self, window: Duration, now: Instant) -> u32 {
        self.admissions
            .iter()
            .filter(|(t, _)| now.duration_since(*t) < window)
            .map(|(_, cost)| *cost)
            .sum()
    }

    /// Whether this ticket is the next in line: head of the interactive
    /// queue, or head of the batch queue with no interactive waiters.
    fn is_front(&self, id: u64, priority: Priority) -> bool {
        match priority {
            Priority::Interactive => self.interactive.front() == Some(&id),
            Priority::Batch => {
                self.interactive.is_empty() && self.batch.front() == Some(&id)
            }
        }
    }

    fn remove(&mut self, id: u64, priority: Priority) {
        let queue = match priority {
            Priority::Interactive => &mut self.interactive,
            Priority::Batch => &mut self.batch,
        };
        queue.retain(|queued| *queued != id);
    }

    /// Earliest future instant at which a past admission leaves a window.
    fn next_release(&self, now: Instant) -> Option<Instant> {
        self.admissions
            .iter()
            .flat_map(|(t, _)| [*t + MINUTE_WINDOW, *t + HOUR_WINDOW])
            .filter(|at| *at > now)
            .min()
    }
}

/// Token budget for one `(region, operation)` pair.
pub struct RateBudget {
    region: String,
    operation: String,
    quota: QuotaConfig,
    state: Mutex<BudgetState>,
    notify: Notify,
}

impl RateBudget {
    fn new(region: String, operation: String, quota: QuotaConfig) -> Self {
        Self {
            region,
            operation,
            quota,
            state: Mutex::new(BudgetState::new()),
            notify: Notify::new(),
        }
    }

    /// Suspend until `cost` tokens are admissible, then consume them.
    ///
    /// Serving order: priority class first, FIFO within the class. Dropping
    /// the returned future releases the caller's place in line.
    pub async fn acquire(&self, cost: u32, priority: Priority) -> Result<(), MonitorError> {
        if cost > self.quota.per_minute || cost > self.quota.per_hour {
            return Err(MonitorError::Config(format!(
                "Admission cost {cost} exceeds the quota ceiling for \
                 region '{}' operation '{}'",
                self.region, self.operation
            )));
        }

        let ticket = self.enqueue(priority);

        loop {
            // Arm the wakeup before inspecting state so a notification
            // between the check and the await is never lost.
            let mut notified = pin!(self.notify.notified());
            notified.as_mut().enable();

            let wake_at = {
                let mut state = self.state.lock().expect("budget lock poisoned");
                let now = Instant::now();
                state.prune(now);

                if state.is_front(ticket.id, priority)
                    && state.used_within(MINUTE_WINDOW, now) + cost <= self.quota.per_minute
                    && state.used_within(HOUR_WINDOW, now) + cost <= self.quota.per_hour
                {
                    state.admissions.push_back((now, cost));
                    state.remove(ticket.id, priority);
                    drop(state);
                    // Tokens may remain for the next waiter.
                    self.notify.notify_waiters();
                    return Ok(());
                }

                state.next_release(now)
            };

            match wake_at {
                Some(at) => {
                    tokio::select! {
                        _ = &mut notified => {}
                        _ = tokio::time::sleep_until(at) => {}
                    }
                }
                // No admission pending expiry: only a queue change can
                // unblock this waiter.
                None => notified.await,
            }
        }
    }

    fn enqueue(&self, priority: Priority) -> Ticket<'_> {
        let mut state = self.state.lock().expect("budget lock poisoned");
        let id = state.next_ticket;
        state.next_ticket += 1;
        match priority {
            Priority::Interactive => state.interactive.push_back(id),
            Priority::Batch => state.batch.push_back(id),
        }
        Ticket {
            budget: self,
            id,
            priority,
        }
    }
}

// ---------------------------------------------------------------------------
// RateLimiter
// ---------------------------------------------------------------------------

/// The set of budgets, keyed by `(region, operation)`.
///
/// Budgets are created lazily per operation from the region's quota; quotas
/// are validated once at construction, which is the only place a limiter
/// can fail.
pub struct RateLimiter {
    quotas: HashMap<String, QuotaConfig>,
    budgets: Mutex<HashMap<(String, String), Arc<RateBudget>>>,
}

impl RateLimiter {
    /// Build a limiter from per-region quotas. Zero ceilings are fatal.
    pub fn new(quotas: HashMap<String, QuotaConfig>) -> Result<Self, MonitorError> {
        for (region, quota) in &quotas {
            quota.validate(region)?;
        }
        Ok(Self {
            quotas,
            budgets: Mutex::new(HashMap::new()),
        })
    }

    /// The budget for `(region, operation)`, creating it on first use.
    pub fn budget(&self, region: &str, operation: &str) -> Result<Arc<RateBudget>, MonitorError> {
        let quota = self
            .quotas
            .get(region)
            .ok_or_else(|| MonitorError::UnknownRegion(region.to_string()))?
            .clone();

        let mut budgets = self.budgets.lock().expect("budget map lock poisoned");
        let budget = budgets
            .entry((region.to_string(), operation.to_string()))
            .or_insert_with(|| {
                Arc::new(RateBudget::new(
                    region.to_string(),
                    operation.to_string(),
                    quota,
                ))
            });
        Ok(Arc::clone(budget))
    }

    /// Convenience: look up the budget and acquire in one call.
    pub async fn acquire(
        &self,
        region: &str,
        operation: &str,
        cost: u32,
        priority: Priority,
    ) -> Result<(), MonitorError> {
        self.budget(region, operation)?.acquire(cost, priority).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
