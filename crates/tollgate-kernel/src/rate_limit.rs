//! Fixed-window rate limiting: kernel contract.
//!
//! A [`RateWindow`] counts requests for one client key.  Windows reset
//! lazily: the first hit at or after `window_start + ttl` starts a fresh
//! window with a count of one, so memory is bounded by the number of
//! recently active clients and no sweeper is needed.
//!
//! [`RateLimitStore`] is the injectable seam for where windows live.  The
//! contract is that [`hit`](RateLimitStore::hit) is atomic per key: two
//! concurrent hits on the same key must both be counted.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Counter state for one client key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateWindow {
    pub client_key: String,
    /// Requests seen in the current window, including rejected ones.
    pub count: u64,
    pub window_start: Instant,
    /// Requests allowed per window.
    pub limit: u64,
    /// Window length.
    pub ttl: Duration,
}

impl RateWindow {
    /// A window that has not seen any request yet.
    pub fn new(client_key: impl Into<String>, limit: u64, ttl: Duration, now: Instant) -> Self {
        Self {
            client_key: client_key.into(),
            count: 0,
            window_start: now,
            limit,
            ttl,
        }
    }

    /// `true` once `ttl` has elapsed since the window started.
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.window_start) >= self.ttl
    }

    /// Count one request at `now`, resetting the window first if it expired.
    pub fn record_hit(&mut self, now: Instant) {
        if self.is_expired(now) {
            self.count = 0;
            self.window_start = now;
        }
        self.count = self.count.saturating_add(1);
    }

    /// `true` while the count is within the limit.
    pub fn allows(&self) -> bool {
        self.count <= self.limit
    }

    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.count)
    }

    /// Time until this window resets, as seen at `now`.
    pub fn retry_after(&self, now: Instant) -> Duration {
        self.ttl
            .saturating_sub(now.saturating_duration_since(self.window_start))
    }
}

/// The backing store failed to count a hit.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("rate limit store unavailable: {0}")]
pub struct RateStoreError(pub String);

/// Storage for rate windows, keyed by client.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Atomically record one request for `client_key` and return a snapshot
    /// of the window after the hit.
    async fn hit(
        &self,
        client_key: &str,
        limit: u64,
        ttl: Duration,
    ) -> Result<RateWindow, RateStoreError>;

    /// Number of windows currently held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn counts_until_limit_then_denies() {
        let now = Instant::now();
        let mut w = RateWindow::new("1.2.3.4", 2, Duration::from_secs(60), now);
        w.record_hit(now);
        assert!(w.allows());
        w.record_hit(now);
        assert!(w.allows());
        assert_eq!(w.remaining(), 0);
        w.record_hit(now);
        assert!(!w.allows());
        assert_eq!(w.count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn resets_lazily_once_ttl_elapsed() {
        let start = Instant::now();
        let mut w = RateWindow::new("k", 1, Duration::from_secs(10), start);
        w.record_hit(start);
        w.record_hit(start);
        assert!(!w.allows());

        tokio::time::advance(Duration::from_secs(10)).await;
        let later = Instant::now();
        w.record_hit(later);
        assert_eq!(w.count, 1);
        assert_eq!(w.window_start, later);
        assert!(w.allows());
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_counts_down_to_window_end() {
        let start = Instant::now();
        let w = RateWindow::new("k", 1, Duration::from_secs(60), start);
        tokio::time::advance(Duration::from_secs(15)).await;
        assert_eq!(w.retry_after(Instant::now()), Duration::from_secs(45));
    }
}
