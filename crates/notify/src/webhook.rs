//! Webhook delivery with rate-limit-aware retry.
//!
//! [`WebhookNotifier`] POSTs a JSON-encoded [`RegionSummary`] to a region's
//! configured URL. Only a provider rate-limit response (HTTP 429) is
//! retried, with jittered exponential backoff; any other failure is
//! reported to the caller after a single attempt.

use std::time::Duration;

use linkwatch_core::retry::RetryPolicy;

use crate::message::RegionSummary;

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Status code the receiving side uses to throttle senders.
const HTTP_TOO_MANY_REQUESTS: u16 = 429;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for webhook delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The receiver throttled the sender; retries were exhausted.
    #[error("Webhook rate-limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    /// The remote server returned a non-2xx, non-429 status code.
    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// WebhookNotifier
// ---------------------------------------------------------------------------

/// Delivers region summaries to external webhook endpoints.
pub struct WebhookNotifier {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl WebhookNotifier {
    /// Create a notifier with a pre-configured HTTP client.
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            client,
            retry: RetryPolicy::for_webhook_throttle(),
        }
    }

    /// Deliver a summary to a webhook URL.
    ///
    /// HTTP 429 responses are retried with jittered backoff up to the
    /// policy's attempt bound. Other failures return immediately — the
    /// dispatcher logs and counts them, it does not retry.
    pub async fn send(&self, url: &str, summary: &RegionSummary) -> Result<(), WebhookError> {
        let mut attempt = 0u32;

        loop {
            match self.try_send(url, summary).await {
                Ok(()) => return Ok(()),
                Err(WebhookError::HttpStatus(HTTP_TOO_MANY_REQUESTS)) => {
                    if !self.retry.should_retry(attempt) {
                        tracing::error!(
                            url,
                            region = %summary.region,
                            attempts = attempt + 1,
                            "Webhook still throttling after final retry"
                        );
                        return Err(WebhookError::RateLimited {
                            attempts: attempt + 1,
                        });
                    }
                    let delay = self.retry.delay_for_attempt(attempt);
                    tracing::warn!(
                        url,
                        region = %summary.region,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Webhook rate-limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(url, region = %summary.region, error = %e, "Webhook delivery failed");
                    return Err(e);
                }
            }
        }
    }

    /// Execute a single POST request and check the response status.
    async fn try_send(&self, url: &str, summary: &RegionSummary) -> Result<(), WebhookError> {
        let response = self.client.post(url).json(summary).send().await?;
        if !response.status().is_success() {
            return Err(WebhookError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

impl Default for WebhookNotifier {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_does_not_panic() {
        let _notifier = WebhookNotifier::new();
    }

    #[test]
    fn rate_limited_error_reports_attempts() {
        let err = WebhookError::RateLimited { attempts: 4 };
        assert_eq!(err.to_string(), "Webhook rate-limited after 4 attempts");
    }

    #[test]
    fn http_status_error_display() {
        let err = WebhookError::HttpStatus(502);
        assert_eq!(err.to_string(), "Webhook returned HTTP 502");
    }
}
