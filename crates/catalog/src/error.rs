//! Upstream error taxonomy.
//!
//! The one distinction that matters to the fallback chain: a client error
//! (4xx) means "this source has nothing for this code, do not retry", while
//! a transient error (5xx, timeout, connect failure) may succeed on retry.

/// Errors from an upstream catalog source.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The upstream rejected the request (4xx). Not retryable.
    #[error("Upstream client error: HTTP {status}")]
    Client { status: u16 },

    /// The upstream failed transiently (5xx, network, timeout). Retryable.
    #[error("Upstream transient error: {0}")]
    Transient(String),

    /// The upstream responded but the payload could not be interpreted.
    #[error("Upstream response parse error: {0}")]
    Parse(String),
}

impl CatalogError {
    /// Whether the chain driver may retry this source before falling through.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Classify an HTTP status code from an upstream response.
    pub fn from_status(status: u16) -> Self {
        if (400..500).contains(&status) {
            Self::Client { status }
        } else {
            Self::Transient(format!("HTTP {status}"))
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        // Any request-level failure (DNS, connect, timeout, body read) is
        // transient; status-carrying responses are classified explicitly
        // before this conversion applies.
        Self::Transient(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn four_xx_is_client_error() {
        assert_matches!(CatalogError::from_status(404), CatalogError::Client { status: 404 });
        assert!(!CatalogError::from_status(404).is_transient());
    }

    #[test]
    fn five_xx_is_transient() {
        assert_matches!(CatalogError::from_status(503), CatalogError::Transient(_));
        assert!(CatalogError::from_status(503).is_transient());
    }

    #[test]
    fn parse_error_is_not_transient() {
        assert!(!CatalogError::Parse("bad json".to_string()).is_transient());
    }
}
