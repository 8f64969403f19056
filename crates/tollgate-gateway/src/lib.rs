//! `tollgate-gateway`: Tollgate authenticating gateway runtime.
//!
//! This crate provides the concrete implementations of the kernel contracts
//! defined in `tollgate-kernel`:
//!
//! | Kernel contract | Implementation |
//! |----------------|----------------|
//! | [`GatewayRouter`](tollgate_kernel::GatewayRouter) | [`router::RouteTable`] |
//! | [`ServiceRegistry`](tollgate_kernel::ServiceRegistry) | [`backend::InMemoryServiceRegistry`] |
//! | [`RateLimitStore`](tollgate_kernel::RateLimitStore) | [`middleware::InMemoryRateLimitStore`] |
//! | [`GatewayFilter`](tollgate_kernel::GatewayFilter) | [`filter::JwtAuthFilter`], [`filter::RateLimitFilter`], [`filter::LoggingFilter`] |
//!
//! The [`server::GatewayServer`] wires everything together into an axum HTTP
//! service that proxies to the identity, payments and notifications backends.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use tollgate_gateway::config::GatewaySettings;
//! use tollgate_gateway::server::GatewayServer;
//!
//! #[tokio::main]
//! async fn main() {
//!     let settings = GatewaySettings {
//!         port: 8080,
//!         jwt_secret: "change-me".to_string(),
//!         ..Default::default()
//!     };
//!
//!     GatewayServer::new(settings).start().await.unwrap();
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod server;

// Re-export the kernel types for convenience.
pub use tollgate_kernel as kernel;
