//! Filter module.

mod auth;
mod logger;
mod rate_limit;

pub use auth::{AuthFailure, JwtAuthFilter, TokenClaims};
pub use logger::LoggingFilter;
pub use rate_limit::{RATE_LIMIT_LIMIT_HEADER, RATE_LIMIT_REMAINING_HEADER, RateLimitFilter, client_key};

use std::sync::Arc;
use tollgate_kernel::{FilterAction, FilterError, GatewayContext, GatewayFilter, GatewayResponse};

/// Ordered list of filters executed as a pipeline.
///
/// Filters are sorted by [`FilterOrder`](tollgate_kernel::FilterOrder) in
/// ascending order (lowest value runs first on the request path).
pub struct FilterPipeline {
    filters: Vec<Arc<dyn GatewayFilter>>,
}

impl FilterPipeline {
    /// Build a pipeline from a list of filters, sorted by their declared order.
    pub fn new(mut filters: Vec<Arc<dyn GatewayFilter>>) -> Self {
        filters.sort_by_key(|f| f.order());
        Self { filters }
    }

    /// Filter names in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Run all filters' `on_request` hooks in ascending order.
    ///
    /// Short-circuits on the first `Reject`.
    pub async fn run_request(&self, ctx: &mut GatewayContext) -> Result<FilterAction, FilterError> {
        for filter in &self.filters {
            match filter.on_request(ctx).await? {
                FilterAction::Continue => {}
                other => return Ok(other),
            }
        }
        Ok(FilterAction::Continue)
    }

    /// Run all filters' `on_response` hooks in descending order
    /// (outermost filter last, so it sees the final response).
    pub async fn run_response(
        &self,
        ctx: &GatewayContext,
        resp: &mut GatewayResponse,
    ) -> Result<(), FilterError> {
        for filter in self.filters.iter().rev() {
            filter.on_response(ctx, resp).await?;
        }
        Ok(())
    }
}
