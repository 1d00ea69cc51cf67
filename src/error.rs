//! Error taxonomy for the query and retrieval pipeline.
//!
//! | Variant | Source | Retried |
//! |---------|--------|---------|
//! | [`SearchError::QueryCompile`] | bad input, never sent | no |
//! | [`SearchError::Auth`] | HTTP 401 / 403 | no, cache invalidated |
//! | [`SearchError::RateLimited`] | HTTP 429 | separate budget, then surfaced |
//! | [`SearchError::Transient`] | timeout, connect error, 5xx | yes |
//! | [`SearchError::Http`] | other 4xx | no |
//! | [`SearchError::Fatal`] | malformed response, client setup | no |
//!
//! Attachment failures use [`crate::extract::ExtractError`] and never reach
//! the caller as errors.

use std::time::Duration;

/// Result alias for pipeline operations.
pub type SearchResult<T> = std::result::Result<T, SearchError>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum SearchError {
    #[error("invalid query: {0}")]
    QueryCompile(String),

    #[error("authentication rejected (HTTP {status}); re-enter credentials")]
    Auth { status: u16 },

    #[error("rate limited by server{}", retry_hint(.retry_after))]
    RateLimited { retry_after: Option<Duration> },

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("HTTP {status}: {excerpt}")]
    Http { status: u16, excerpt: String },

    #[error("{0}")]
    Fatal(String),
}

fn retry_hint(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!(" (retry after {}s)", d.as_secs()),
        None => String::new(),
    }
}

impl SearchError {
    /// Whether the retry policy may spend an attempt on this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, SearchError::Transient(_))
    }

    /// Classify a non-success HTTP status with its (already truncated) body.
    pub fn from_status(status: u16, excerpt: String, retry_after: Option<Duration>) -> Self {
        match status {
            401 | 403 => SearchError::Auth { status },
            429 => SearchError::RateLimited { retry_after },
            500..=599 => SearchError::Transient(format!("HTTP {}: {}", status, excerpt)),
            _ => SearchError::Http { status, excerpt },
        }
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            SearchError::Transient(err.to_string())
        } else if err.is_decode() {
            SearchError::Fatal(format!("malformed response: {}", err))
        } else {
            SearchError::Fatal(err.to_string())
        }
    }
}

/// Truncate a response body for error messages.
pub fn excerpt(body: &str) -> String {
    body.chars().take(500).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            SearchError::from_status(403, String::new(), None),
            SearchError::Auth { status: 403 }
        ));
        assert!(matches!(
            SearchError::from_status(401, String::new(), None),
            SearchError::Auth { status: 401 }
        ));
        assert!(matches!(
            SearchError::from_status(429, String::new(), Some(Duration::from_secs(5))),
            SearchError::RateLimited { retry_after: Some(_) }
        ));
        assert!(SearchError::from_status(503, "down".into(), None).is_transient());
        assert!(matches!(
            SearchError::from_status(400, "bad jql".into(), None),
            SearchError::Http { status: 400, .. }
        ));
    }

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(!SearchError::Auth { status: 403 }.is_transient());
        assert!(!SearchError::RateLimited { retry_after: None }.is_transient());
        assert!(!SearchError::QueryCompile("empty".into()).is_transient());
    }

    #[test]
    fn test_excerpt_truncates() {
        let long = "x".repeat(2000);
        assert_eq!(excerpt(&long).len(), 500);
        assert_eq!(excerpt("short"), "short");
    }

    #[test]
    fn test_rate_limited_message() {
        let e = SearchError::RateLimited {
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(e.to_string(), "rate limited by server (retry after 7s)");
    }
}
