//! Shared request-path machinery used by the filters.

mod rate_limit;

pub use rate_limit::{InMemoryRateLimitStore, RateDecision, RateLimiter};
