//! Gateway filter trait and filter-chain types.
//!
//! A filter chain is an ordered list of [`GatewayFilter`] instances applied
//! to every classified request and every relayed response.  Filters run in
//! ascending [`FilterOrder`] on the request path and descending order on the
//! response path.
//!
//! ```text
//! Request  ──► Logging ──► RateLimit ──► Auth
//!                  (dispatch to the backend happens here)
//! Response ◄── Logging ◄── RateLimit ◄── Auth
//! ```
//!
//! Rate limiting sits before authentication so public routes (login,
//! registration) are throttled too.

use super::types::{GatewayContext, GatewayResponse};
use async_trait::async_trait;
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Filter ordering
// ─────────────────────────────────────────────────────────────────────────────

/// Numeric ordering slot for a filter in the chain.
///
/// Any `u32` is accepted so custom filters can slot in between the standard
/// phases.  Equal values keep registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FilterOrder(pub u32);

impl FilterOrder {
    /// Access logging; first in, last out.
    pub const LOGGING: FilterOrder = FilterOrder(0);
    /// Quota enforcement, before any credential is looked at.
    pub const RATE_LIMIT: FilterOrder = FilterOrder(100);
    /// Bearer-token verification.
    pub const AUTH: FilterOrder = FilterOrder(200);
    /// Anything that needs the resolved principal.
    pub const POST_AUTH: FilterOrder = FilterOrder(300);
}

// ─────────────────────────────────────────────────────────────────────────────
// Filter action
// ─────────────────────────────────────────────────────────────────────────────

/// Why a filter refused a request.
///
/// Both variants are terminal for the request; nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Rejection {
    /// Missing, malformed, badly signed or expired token.  Deliberately
    /// carries no detail so callers cannot tell which check failed.
    Unauthenticated,
    /// Quota exhausted for the client key.
    RateLimited {
        /// Seconds until the client's window resets.
        retry_after_secs: u64,
    },
}

/// Instruction returned by [`GatewayFilter::on_request`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FilterAction {
    /// Pass the request to the next filter or to the dispatcher.
    Continue,
    /// Short-circuit the chain.
    Reject(Rejection),
}

/// A filter could not reach a decision (e.g. its backing store failed).
#[derive(Debug, Error, PartialEq, Eq)]
#[error("filter '{filter}' failed: {reason}")]
pub struct FilterError {
    pub filter: String,
    pub reason: String,
}

impl FilterError {
    pub fn new(filter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            reason: reason.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// GatewayFilter trait
// ─────────────────────────────────────────────────────────────────────────────

/// Kernel contract for a single filter in the gateway pipeline.
#[async_trait]
pub trait GatewayFilter: Send + Sync {
    /// Stable identifier for this filter (used in logs).
    fn name(&self) -> &str;

    /// Position in the filter chain.
    fn order(&self) -> FilterOrder;

    /// Called with the classified request before it is dispatched.
    ///
    /// Implementations may mutate `ctx` (attach the principal, record
    /// attributes for the response path).
    async fn on_request(&self, ctx: &mut GatewayContext) -> Result<FilterAction, FilterError>;

    /// Called with the backend response before it is relayed.  Filters may
    /// add headers; the body is never transformed.
    async fn on_response(
        &self,
        _ctx: &GatewayContext,
        _resp: &mut GatewayResponse,
    ) -> Result<(), FilterError> {
        Ok(())
    }
}
