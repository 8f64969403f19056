//! Gateway configuration container and startup validation.
//!
//! [`GatewayConfig`] aggregates the route table, the service registry and
//! the global settings, and exposes a single [`validate()`](GatewayConfig::validate)
//! that checks all structural invariants *before* any runtime resource is
//! allocated.  A route naming an unknown service is a startup failure, never
//! a per-request one.

use super::error::GatewayError;
use super::registry::ServiceRegistryEntry;
use super::router::RouteDescriptor;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// RateLimitConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Fixed-window rate-limit parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Window length in seconds.
    pub ttl_secs: u64,
    /// Requests allowed per window.
    pub limit: u64,
}

impl RateLimitConfig {
    pub fn new(ttl_secs: u64, limit: u64) -> Self {
        Self { ttl_secs, limit }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    fn validate(&self) -> Result<(), GatewayError> {
        if self.ttl_secs == 0 || self.limit == 0 {
            return Err(GatewayError::InvalidRateLimit);
        }
        Ok(())
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(60, 100)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// GatewayConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Route descriptors, in any order.
    pub routes: Vec<RouteDescriptor>,
    /// Backend registry entries.
    pub services: Vec<ServiceRegistryEntry>,
    /// HMAC secret used to verify bearer tokens.
    pub jwt_secret: String,
    /// Per-probe timeout for the health aggregator, in milliseconds.
    pub health_timeout_ms: u64,
    pub rate_limit: RateLimitConfig,
}

impl GatewayConfig {
    /// Construct an empty config with the given token secret.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            routes: Vec::new(),
            services: Vec::new(),
            jwt_secret: jwt_secret.into(),
            health_timeout_ms: 3_000,
            rate_limit: RateLimitConfig::default(),
        }
    }

    /// Builder: add a route.
    pub fn with_route(mut self, route: RouteDescriptor) -> Self {
        self.routes.push(route);
        self
    }

    /// Builder: add a backend.
    pub fn with_service(mut self, service: ServiceRegistryEntry) -> Self {
        self.services.push(service);
        self
    }

    /// Builder: set the health probe timeout.
    pub fn with_health_timeout_ms(mut self, ms: u64) -> Self {
        self.health_timeout_ms = ms;
        self
    }

    /// Builder: set the rate-limit config.
    pub fn with_rate_limit(mut self, rl: RateLimitConfig) -> Self {
        self.rate_limit = rl;
        self
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Validation
    // ─────────────────────────────────────────────────────────────────────────

    /// Validate all structural invariants of this configuration.
    ///
    /// Returns the *first* detected [`GatewayError`].
    ///
    /// Checks performed (in order):
    /// 1. At least one route and one service are defined.
    /// 2. The JWT secret is non-empty.
    /// 3. The health probe timeout and rate limit are non-zero.
    /// 4. Each service passes its own check; names are unique.
    /// 5. Each route passes its own check; ids are unique.
    /// 6. No two routes share a method pattern and path pattern.
    /// 7. Every route's `target_service` is a declared service.
    pub fn validate(&self) -> Result<(), GatewayError> {
        // ── 1. Non-empty tables ───────────────────────────────────────────────
        if self.routes.is_empty() {
            return Err(GatewayError::NoRoutes);
        }
        if self.services.is_empty() {
            return Err(GatewayError::NoServices);
        }

        // ── 2. Secret ─────────────────────────────────────────────────────────
        if self.jwt_secret.is_empty() {
            return Err(GatewayError::EmptyJwtSecret);
        }

        // ── 3. Timeouts / limits ──────────────────────────────────────────────
        if self.health_timeout_ms == 0 {
            return Err(GatewayError::InvalidProbeTimeout);
        }
        self.rate_limit.validate()?;

        // ── 4. Services ───────────────────────────────────────────────────────
        let mut service_names: HashSet<&str> = HashSet::new();
        for service in &self.services {
            service.validate()?;
            if !service_names.insert(service.name.as_str()) {
                return Err(GatewayError::DuplicateService(service.name.clone()));
            }
        }

        // ── 5 + 6 + 7. Routes ─────────────────────────────────────────────────
        let mut route_ids: HashSet<&str> = HashSet::new();
        let mut shapes = HashMap::new();
        for route in &self.routes {
            route.validate()?;
            if !route_ids.insert(route.id.as_str()) {
                return Err(GatewayError::DuplicateRoute(route.id.clone()));
            }
            let shape = (route.method, route.parsed_pattern()?);
            if let Some(other) = shapes.insert(shape, route.id.as_str()) {
                return Err(GatewayError::AmbiguousRoute(
                    route.id.clone(),
                    other.to_string(),
                ));
            }
            if !service_names.contains(route.target_service.as_str()) {
                return Err(GatewayError::UnknownService(
                    route.id.clone(),
                    route.target_service.clone(),
                ));
            }
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
