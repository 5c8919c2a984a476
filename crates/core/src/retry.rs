//! Retry policy with exponential backoff, cap, and jitter.
//!
//! Delays are computed as data up front: callers ask the policy for the
//! delay of attempt N and sleep themselves. The policy never sleeps and
//! never owns control flow.

use std::time::Duration;

use rand::Rng;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Base delay for the first retry (before jitter).
    pub base_delay: Duration,
    /// Upper bound on the delay between attempts (before jitter).
    pub max_delay: Duration,
    /// Maximum number of retry attempts (0 = no retries, just the initial attempt).
    pub max_retries: u32,
    /// Jitter factor: the delay is multiplied by a random value in
    /// `[1 - jitter, 1 + jitter]`. Set to 0.0 for no jitter.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            max_retries: 2,
            jitter: 0.25,
        }
    }
}

impl RetryPolicy {
    /// Policy for transient upstream catalog failures (5xx, timeouts).
    ///
    /// Two retries keeps the chain moving; a source that fails three times
    /// in a row is skipped in favor of the next fallback.
    pub fn for_catalog_calls() -> Self {
        Self::default()
    }

    /// Policy for rate-limited webhook deliveries.
    ///
    /// Longer base delay: the receiving side throttles per minute, so
    /// sub-second retries would only burn attempts.
    pub fn for_webhook_throttle() -> Self {
        Self {
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            max_retries: 3,
            jitter: 0.25,
        }
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    ///
    /// Exponential backoff: `base * 2^attempt`, capped at `max_delay`, then
    /// multiplied by the jitter factor.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let exponential_ms = base_ms.saturating_mul(1u64 << attempt.min(20));
        let capped_ms = exponential_ms.min(self.max_delay.as_millis() as u64);

        let jittered_ms = if self.jitter > 0.0 {
            let factor: f64 = rand::rng().random_range((1.0 - self.jitter)..=(1.0 + self.jitter));
            (capped_ms as f64 * factor) as u64
        } else {
            capped_ms
        };

        Duration::from_millis(jittered_ms)
    }

    /// Check if another retry attempt should be made.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter(policy: RetryPolicy) -> RetryPolicy {
        RetryPolicy {
            jitter: 0.0,
            ..policy
        }
    }

    #[test]
    fn delay_grows_exponentially() {
        let policy = no_jitter(RetryPolicy {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(60),
            max_retries: 5,
            jitter: 0.0,
        });
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
    }

    #[test]
    fn delay_is_capped() {
        let policy = no_jitter(RetryPolicy {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(4),
            max_retries: 10,
            jitter: 0.0,
        });
        assert_eq!(policy.delay_for_attempt(10), Duration::from_secs(4));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(10),
            max_retries: 3,
            jitter: 0.25,
        };
        for attempt in 0..3 {
            let delay = policy.delay_for_attempt(attempt).as_millis() as f64;
            let nominal = (1000u64 << attempt) as f64;
            assert!(delay >= nominal * 0.75 - 1.0, "delay {delay} below jitter floor");
            assert!(delay <= nominal * 1.25 + 1.0, "delay {delay} above jitter ceiling");
        }
    }

    #[test]
    fn retries_are_bounded() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(1));
        assert!(!policy.should_retry(2));
    }

    #[test]
    fn huge_attempt_does_not_overflow() {
        let policy = no_jitter(RetryPolicy::default());
        let _ = policy.delay_for_attempt(u32::MAX);
    }
}
