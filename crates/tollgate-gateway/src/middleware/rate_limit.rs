//! Per-client fixed-window rate limiting

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tollgate_kernel::{RateLimitStore, RateStoreError, RateWindow};
use tracing::warn;

/// In-process window store.
///
/// Each key's window is updated under the DashMap shard lock, so concurrent
/// hits on one key are serialized and never lost.  Windows are reset lazily
/// on the next hit; nothing is swept in the background.
#[derive(Default)]
pub struct InMemoryRateLimitStore {
    windows: DashMap<String, RateWindow>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn hit(
        &self,
        client_key: &str,
        limit: u64,
        ttl: Duration,
    ) -> Result<RateWindow, RateStoreError> {
        let now = Instant::now();

        // Avoid allocating the key on the hot path for known clients.
        if let Some(mut window) = self.windows.get_mut(client_key) {
            window.limit = limit;
            window.ttl = ttl;
            window.record_hit(now);
            return Ok(window.clone());
        }

        let mut window = self
            .windows
            .entry(client_key.to_string())
            .or_insert_with(|| RateWindow::new(client_key, limit, ttl, now));
        window.record_hit(now);
        Ok(window.clone())
    }

    fn len(&self) -> usize {
        self.windows.len()
    }
}

/// Outcome of one rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    /// Time until the client's window resets.
    pub retry_after: Duration,
}

impl RateDecision {
    /// Whole seconds until the window resets, rounded up and at least one,
    /// so a client never retries a moment too early.
    pub fn retry_after_secs(&self) -> u64 {
        self.retry_after
            .as_secs()
            .saturating_add(u64::from(self.retry_after.subsec_nanos() > 0))
            .max(1)
    }
}

/// Per-client rate limiter
///
/// Each client key gets `limit` requests per `ttl`.  Requests over the limit
/// are still counted, so hammering a closed window does not reopen it early.
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    limit: u64,
    ttl: Duration,
}

impl RateLimiter {
    /// Create a limiter backed by a fresh [`InMemoryRateLimitStore`].
    pub fn new(limit: u64, ttl: Duration) -> Self {
        Self::with_store(Arc::new(InMemoryRateLimitStore::new()), limit, ttl)
    }

    pub fn with_store(store: Arc<dyn RateLimitStore>, limit: u64, ttl: Duration) -> Self {
        Self { store, limit, ttl }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Count one request from `client_key` and decide whether it may proceed.
    pub async fn check(&self, client_key: &str) -> Result<RateDecision, RateStoreError> {
        let window = self.store.hit(client_key, self.limit, self.ttl).await?;
        Ok(RateDecision {
            allowed: window.allows(),
            limit: self.limit,
            remaining: window.remaining(),
            retry_after: window.retry_after(Instant::now()),
        })
    }

    /// Return `true` if the request from `client_key` is allowed.
    ///
    /// A store failure denies the request.
    pub async fn allow(&self, client_key: &str) -> bool {
        match self.check(client_key).await {
            Ok(decision) => decision.allowed,
            Err(e) => {
                warn!(client = %client_key, error = %e, "rate limit store failed, denying");
                false
            }
        }
    }
}
