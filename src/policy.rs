//! Call policies wrapped around the remote search request.
//!
//! The retrieval client composes three independent pieces:
//!
//! ```text
//! ResponseCache::get ──hit──▶ ResultSet
//!        │ miss
//!        ▼
//! RetryPolicy::run ─┬─▶ RateLimiter::acquire ─▶ HTTP GET
//!                   └── backoff on Transient / RateLimited
//!        │ Ok
//!        ▼
//! ResponseCache::insert
//! ```
//!
//! Each type can be built and exercised on its own.

use moka::future::Cache;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{SearchError, SearchResult};
use crate::filter::ResultSet;
use crate::models::CompiledQuery;

// ============ Rate limiter ============

/// Enforces a minimum spacing between calls, process-wide for every holder
/// of the same handle.
///
/// The lock is held while waiting, so concurrent callers queue up and are
/// released one interval apart. The first call never waits.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Limiter allowing at most `requests_per_minute` calls per minute.
    /// `0` disables spacing.
    pub fn per_minute(requests_per_minute: u32) -> Self {
        let min_interval = if requests_per_minute == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(60) / requests_per_minute
        };
        Self::with_interval(min_interval)
    }

    pub fn with_interval(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until a call is allowed, then record it.
    pub async fn acquire(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let ready_at = prev + self.min_interval;
            let now = Instant::now();
            if ready_at > now {
                debug!(wait_ms = (ready_at - now).as_millis() as u64, "rate limiter delaying call");
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}

// ============ Retry policy ============

/// Bounded retry with exponential backoff.
///
/// Only [`SearchError::Transient`] spends an attempt. A 429
/// ([`SearchError::RateLimited`]) waits and retries on its own budget so it
/// never eats into the transient attempts; once that budget is gone the 429
/// is surfaced to the caller. Everything else returns immediately.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub rate_limit_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            rate_limit_retries: 2,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based): `min * 2^(retry-1)`,
    /// capped at `max_delay`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(16);
        self.min_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails terminally, or the budgets run out.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> SearchResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SearchResult<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0u32;
        let mut rate_limited = 0u32;

        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(SearchError::RateLimited { retry_after }) => {
                    if rate_limited >= self.rate_limit_retries {
                        return Err(SearchError::RateLimited { retry_after });
                    }
                    rate_limited += 1;
                    // A 429 does not consume an attempt.
                    attempt -= 1;
                    let delay = retry_after
                        .unwrap_or_else(|| self.backoff(rate_limited))
                        .min(self.max_delay);
                    warn!(delay_ms = delay.as_millis() as u64, "server rate limit hit, backing off");
                    tokio::time::sleep(delay).await;
                }
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

// ============ Response cache ============

/// Cache key: the compiled query plus the credential scope it ran under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub query: CompiledQuery,
    pub identity: String,
}

/// TTL cache of successful search responses.
#[derive(Clone)]
pub struct ResponseCache {
    cache: Cache<CacheKey, ResultSet>,
}

impl ResponseCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity.max(1))
            .time_to_live(ttl)
            .support_invalidation_closures()
            .build();
        Self { cache }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<ResultSet> {
        self.cache.get(key).await
    }

    pub async fn insert(&self, key: CacheKey, results: ResultSet) {
        self.cache.insert(key, results).await;
    }

    /// Drop every entry cached under one credential scope.
    pub fn invalidate_scope(&self, identity: &str) {
        let identity: Arc<str> = Arc::from(identity);
        let result = self
            .cache
            .invalidate_entries_if(move |key, _| *key.identity == *identity);
        if let Err(e) = result {
            // Fall back to a full clear; never serve this scope again.
            warn!(error = %e, "scoped invalidation failed, clearing response cache");
            self.cache.invalidate_all();
        }
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}
