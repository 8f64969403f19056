//! Structured access-logging filter.
//!
//! Emits `tracing` events on both the request and response path, recording
//! path, method, request id, client, principal, response status, target
//! service and round-trip latency.

use async_trait::async_trait;
use tokio::time::Instant;
use tollgate_kernel::{
    FilterAction, FilterError, FilterOrder, GatewayContext, GatewayFilter, GatewayResponse,
};
use tracing::{info, warn};

const START_ATTR: &str = "log.request_start_ms";

/// Logging filter: records inbound requests and relayed responses.
pub struct LoggingFilter {
    epoch: Instant,
}

impl Default for LoggingFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingFilter {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

#[async_trait]
impl GatewayFilter for LoggingFilter {
    fn name(&self) -> &str {
        "access-log"
    }

    fn order(&self) -> FilterOrder {
        FilterOrder::LOGGING
    }

    async fn on_request(&self, ctx: &mut GatewayContext) -> Result<FilterAction, FilterError> {
        let route = ctx.route_match.as_ref().map(|m| m.route_id.as_str());
        info!(
            request_id = %ctx.request.id,
            method     = ctx.request.method.as_str(),
            path       = %ctx.request.path,
            client     = %ctx.client_key,
            route      = route.unwrap_or("-"),
            "→ inbound request"
        );
        ctx.set_attr(START_ATTR, &self.elapsed_ms());
        Ok(FilterAction::Continue)
    }

    async fn on_response(
        &self,
        ctx: &GatewayContext,
        resp: &mut GatewayResponse,
    ) -> Result<(), FilterError> {
        let start_ms: u64 = ctx.get_attr(START_ATTR).unwrap_or(0);
        let elapsed = self.elapsed_ms().saturating_sub(start_ms);
        let principal = ctx.principal.as_ref().map(|p| p.subject_id.as_str());

        if resp.status >= 500 {
            warn!(
                request_id = %ctx.request.id,
                path       = %ctx.request.path,
                status     = resp.status,
                service    = %resp.service,
                principal  = principal.unwrap_or("-"),
                latency_ms = elapsed,
                "← upstream error response"
            );
        } else {
            info!(
                request_id = %ctx.request.id,
                path       = %ctx.request.path,
                status     = resp.status,
                service    = %resp.service,
                principal  = principal.unwrap_or("-"),
                latency_ms = elapsed,
                "← outbound response"
            );
        }

        resp.latency_ms = elapsed;
        Ok(())
    }
}
