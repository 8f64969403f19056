//! Fixed-window rate-limit filter.
//!
//! Each client key (API key when the caller sends one, otherwise the client
//! address) gets `limit` requests per window.  The filter runs before
//! authentication, so public routes are throttled too.

use crate::middleware::RateLimiter;
use async_trait::async_trait;
use http::{HeaderMap, HeaderValue};
use std::net::IpAddr;
use std::sync::Arc;
use tollgate_kernel::{
    FilterAction, FilterError, FilterOrder, GatewayContext, GatewayFilter, GatewayResponse,
    Rejection,
};
use tracing::warn;

pub const RATE_LIMIT_LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

const REMAINING_ATTR: &str = "rate_limit.remaining";

/// Derive the rate-limit key for a request.
///
/// Order of preference: `x-api-key`, the peer address of the connection,
/// the first `x-forwarded-for` hop, then a shared `"unknown"` bucket.
///
/// The API key is taken as presented and never verified, so a caller that
/// sends a fresh key on every request gets a fresh window each time (and
/// one more map entry until it is next touched).  Only put this gateway
/// behind something that issues and checks keys if key-based quotas must
/// hold against hostile clients.
pub fn client_key(headers: &HeaderMap, peer: Option<IpAddr>) -> String {
    if let Some(key) = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty())
    {
        return format!("key:{key}");
    }
    if let Some(ip) = peer {
        return ip.to_string();
    }
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map_or_else(|| "unknown".to_string(), str::to_string)
}

/// Rate-limit filter backed by a [`RateLimiter`].
///
/// The limiter is shared with the gateway's own endpoints so `/health` and
/// `/metrics` draw from the same per-client quota.
pub struct RateLimitFilter {
    limiter: Arc<RateLimiter>,
}

impl RateLimitFilter {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

#[async_trait]
impl GatewayFilter for RateLimitFilter {
    fn name(&self) -> &str {
        "rate-limit"
    }

    fn order(&self) -> FilterOrder {
        FilterOrder::RATE_LIMIT
    }

    async fn on_request(&self, ctx: &mut GatewayContext) -> Result<FilterAction, FilterError> {
        let decision = self
            .limiter
            .check(&ctx.client_key)
            .await
            .map_err(|e| FilterError::new(self.name(), e.to_string()))?;

        ctx.set_attr(REMAINING_ATTR, &decision.remaining);
        if decision.allowed {
            return Ok(FilterAction::Continue);
        }

        let retry_after_secs = decision.retry_after_secs();
        warn!(
            request_id = %ctx.request.id,
            client = %ctx.client_key,
            retry_after_secs,
            "rate limit exceeded"
        );
        Ok(FilterAction::Reject(Rejection::RateLimited { retry_after_secs }))
    }

    async fn on_response(
        &self,
        ctx: &GatewayContext,
        resp: &mut GatewayResponse,
    ) -> Result<(), FilterError> {
        resp.headers.insert(
            RATE_LIMIT_LIMIT_HEADER,
            HeaderValue::from(self.limiter.limit()),
        );
        if let Some(remaining) = ctx.get_attr::<u64>(REMAINING_ATTR) {
            resp.headers
                .insert(RATE_LIMIT_REMAINING_HEADER, HeaderValue::from(remaining));
        }
        Ok(())
    }
}
