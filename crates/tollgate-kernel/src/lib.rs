//! Tollgate gateway kernel contract.
//!
//! This crate defines the *trait interfaces, data model and configuration
//! types* for the Tollgate authenticating gateway.  No network I/O lives
//! here; the runtime is `tollgate-gateway`.
//!
//! # Architecture mapping
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              tollgate-kernel  (this crate)                  │
//! │  GatewayRouter trait     ServiceRegistry trait              │
//! │  GatewayFilter trait     RateLimitStore trait               │
//! │  GatewayConfig + validate()   HealthReport   Principal      │
//! └──────────────────────────┬──────────────────────────────────┘
//!                            │  depends on
//! ┌──────────────────────────▼──────────────────────────────────┐
//! │              tollgate-gateway  (runtime crate)              │
//! │  RouteTable: impl GatewayRouter                             │
//! │  InMemoryServiceRegistry: impl ServiceRegistry              │
//! │  InMemoryRateLimitStore: impl RateLimitStore                │
//! │  LoggingFilter / RateLimitFilter / JwtAuthFilter            │
//! │  Dispatcher (reqwest)   HealthAggregator   GatewayServer    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust
//! use tollgate_kernel::{GatewayConfig, RouteDescriptor, ServiceRegistryEntry};
//!
//! let config = GatewayConfig::new("change-me")
//!     .with_service(ServiceRegistryEntry::new("auth", "http://localhost:3001", 10_000))
//!     .with_route(RouteDescriptor::new("auth-login", "/auth/login", "auth").public())
//!     .with_route(RouteDescriptor::new("auth-family", "/auth/*", "auth"));
//!
//! config.validate().expect("gateway config is valid");
//! ```

pub mod error;
pub mod filter;
pub mod health;
pub mod rate_limit;
pub mod registry;
pub mod router;
pub mod types;
pub mod validation;

// ── Flat re-exports ────────────────────────────────────────────────────────

pub use error::GatewayError;
pub use filter::{FilterAction, FilterError, FilterOrder, GatewayFilter, Rejection};
pub use health::{HealthReport, OverallHealth, ProbeStatus, UNAVAILABLE_DETAIL};
pub use rate_limit::{RateLimitStore, RateStoreError, RateWindow};
pub use registry::{DEFAULT_HEALTH_PATH, ServiceRegistry, ServiceRegistryEntry};
pub use router::{GatewayRouter, MethodPattern, PathPattern, RouteDescriptor, Visibility};
pub use types::{GatewayContext, GatewayRequest, GatewayResponse, HttpMethod, Principal, RouteMatch};
pub use validation::{GatewayConfig, RateLimitConfig};
