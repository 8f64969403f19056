//! Gateway error types for `tollgate-kernel`.
//!
//! [`GatewayError`] covers every failure mode that can be detected at
//! *definition time*, before any listener is bound: empty ids, duplicate or
//! ambiguous routes, routes naming a service the registry does not know,
//! invalid base URLs.  Runtime failures (unauthenticated caller, upstream
//! unreachable, …) belong in the gateway runtime crate (`tollgate-gateway`).

use thiserror::Error;

/// Configuration error type for the gateway kernel contract.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum GatewayError {
    // ── Routes ───────────────────────────────────────────────────────────────
    /// The configuration contains no routes.
    #[error("gateway config must define at least one route")]
    NoRoutes,

    /// A route `id` field is empty or whitespace-only.
    #[error("route id cannot be empty")]
    EmptyRouteId,

    /// A route with this id has already been registered.
    #[error("route '{0}' is already registered")]
    DuplicateRoute(String),

    /// Two routes share the same method pattern and path pattern, so neither
    /// is more specific than the other.
    #[error("route '{0}' is ambiguous with route '{1}'")]
    AmbiguousRoute(String, String),

    /// A route references a service name that is not present in the registry.
    #[error("route '{0}' references unknown service '{1}'")]
    UnknownService(String, String),

    /// A route path pattern is syntactically invalid.
    #[error("route '{0}' has an invalid path pattern: {1}")]
    InvalidPathPattern(String, String),

    // ── Services ─────────────────────────────────────────────────────────────
    /// The configuration contains no services.
    #[error("gateway config must define at least one service")]
    NoServices,

    /// A service `name` field is empty or whitespace-only.
    #[error("service name cannot be empty")]
    EmptyServiceName,

    /// A service with this name has already been registered.
    #[error("service '{0}' is already registered")]
    DuplicateService(String),

    /// A service base URL is syntactically invalid.
    #[error("service '{0}' has an invalid base URL: {1}")]
    InvalidBaseUrl(String, String),

    /// A service call timeout of zero would fail every forwarded request.
    #[error("service '{0}' call timeout must be greater than 0 ms")]
    InvalidTimeout(String),

    // ── Auth / rate limits ───────────────────────────────────────────────────
    /// The token verification secret is empty.
    #[error("JWT secret cannot be empty")]
    EmptyJwtSecret,

    /// A rate limit of zero requests, or a zero-length window.
    #[error("rate limit must allow at least one request per non-zero window")]
    InvalidRateLimit,

    /// The health probe timeout is zero.
    #[error("health probe timeout must be greater than 0 ms")]
    InvalidProbeTimeout,
}
