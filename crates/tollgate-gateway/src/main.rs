//! Tollgate gateway: entry point.
//!
//! Reads configuration from environment variables (see
//! [`tollgate_gateway::config`]) and starts the axum-based HTTP gateway.

use tollgate_gateway::config::{GatewaySettings, LogFormat};
use tollgate_gateway::server::GatewayServer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tollgate_gateway=info,tower_http=info"));
    match LogFormat::from_env() {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    let settings = GatewaySettings::from_env();
    if settings.uses_default_secret() {
        warn!(
            "JWT_SECRET is not set, using the built-in development secret. \
             Do not use this configuration in production."
        );
    }

    info!(
        port = settings.port,
        auth = %settings.auth_service_url,
        payments = %settings.payments_service_url,
        notifications = %settings.notifications_service_url,
        rate_limit_max = settings.rate_limit_max,
        rate_limit_ttl_secs = settings.rate_limit_ttl_secs,
        "Tollgate configuration loaded"
    );

    if let Err(e) = GatewayServer::new(settings).start().await {
        eprintln!("Gateway error: {e}");
        std::process::exit(1);
    }
}
