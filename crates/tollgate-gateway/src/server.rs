//! Axum-based HTTP gateway server.
//!
//! [`GatewayServer`] wires together the route table, filter pipeline,
//! dispatcher and health aggregator into a running axum service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Composite health of the gateway and every backend.  Always `200 OK`. |
//! | `GET`  | `/metrics` | Prometheus text exposition. |
//! | `ANY`  | *(everything else)* | Classified by the route table, filtered, then proxied. |
//!
//! Every endpoint counts against the caller's rate-limit quota.

use crate::backend::{Dispatcher, HealthAggregator, InMemoryServiceRegistry, REQUEST_ID_HEADER};
use crate::config::GatewaySettings;
use crate::error::{ProxyError, ProxyResult, StartupError};
use crate::filter::{FilterPipeline, JwtAuthFilter, LoggingFilter, RateLimitFilter, client_key};
use crate::metrics::GatewayMetrics;
use crate::middleware::RateLimiter;
use crate::router::RouteTable;
use axum::{
    Json, Router,
    body::{Body, to_bytes},
    extract::{ConnectInfo, Request, State},
    http::{Extensions, HeaderMap, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tollgate_kernel::{
    FilterAction, GatewayConfig, GatewayContext, GatewayFilter, GatewayRequest, GatewayResponse,
    GatewayRouter, HttpMethod, ServiceRegistry,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

/// Largest inbound body the gateway will buffer.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Metric label for requests the gateway answered itself.
const GATEWAY_LABEL: &str = "gateway";

// ─────────────────────────────────────────────────────────────────────────────
// Shared application state
// ─────────────────────────────────────────────────────────────────────────────

/// Shared state injected into every axum handler via [`State`] extractor.
#[derive(Clone)]
pub struct AppState {
    routes: Arc<RouteTable>,
    pipeline: Arc<FilterPipeline>,
    limiter: Arc<RateLimiter>,
    dispatcher: Arc<Dispatcher>,
    health: Arc<HealthAggregator>,
    metrics: Arc<GatewayMetrics>,
}

impl AppState {
    /// Construct every shared service once from a configuration.
    ///
    /// The configuration is validated first; nothing is built from an
    /// invalid one.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, StartupError> {
        config.validate()?;

        let routes = RouteTable::from_routes(config.routes.iter().cloned())?;
        let registry: Arc<dyn ServiceRegistry> = Arc::new(InMemoryServiceRegistry::from_entries(
            config.services.iter().cloned(),
        )?);

        // One pooled client for every upstream call and probe.
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit.limit,
            config.rate_limit.ttl(),
        ));
        let filters: Vec<Arc<dyn GatewayFilter>> = vec![
            Arc::new(LoggingFilter::new()),
            Arc::new(RateLimitFilter::new(limiter.clone())),
            Arc::new(JwtAuthFilter::new(&config.jwt_secret)),
        ];

        Ok(Self {
            routes: Arc::new(routes),
            pipeline: Arc::new(FilterPipeline::new(filters)),
            limiter,
            dispatcher: Arc::new(Dispatcher::new(client.clone(), registry.clone())),
            health: Arc::new(HealthAggregator::new(
                client,
                registry,
                config.health_timeout(),
            )),
            metrics: Arc::new(GatewayMetrics::new()?),
        })
    }

    /// The axum router serving this state.
    pub fn into_router(self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([
                Method::GET,
                Method::HEAD,
                Method::PUT,
                Method::PATCH,
                Method::POST,
                Method::DELETE,
            ])
            .allow_headers(Any);

        Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .method_not_allowed_fallback(method_not_allowed_handler)
            .fallback(proxy_handler)
            .with_state(self)
            .layer(TraceLayer::new_for_http())
            .layer(cors)
    }

    /// Count one request against the caller's quota for endpoints the
    /// gateway answers itself.
    async fn throttle(&self, headers: &HeaderMap, extensions: &Extensions) -> ProxyResult<()> {
        let client = client_key(headers, peer_ip(extensions));
        let decision = self
            .limiter
            .check(&client)
            .await
            .map_err(|e| ProxyError::Internal(e.to_string()))?;
        if decision.allowed {
            return Ok(());
        }
        warn!(client = %client, "rate limit exceeded");
        Err(ProxyError::RateLimited {
            retry_after_secs: decision.retry_after_secs(),
        })
    }

    /// Record a gateway-originated failure and render it.
    fn reject(&self, err: ProxyError) -> Response {
        let label = match &err {
            ProxyError::UpstreamUnavailable { service, .. } => service.as_str(),
            _ => GATEWAY_LABEL,
        };
        self.metrics.record_request(label, err.status().as_u16());
        self.metrics.record_rejection(err.reason());
        err.into_response()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// GatewayServer
// ─────────────────────────────────────────────────────────────────────────────

/// High-level gateway server built from [`GatewaySettings`].
pub struct GatewayServer {
    settings: GatewaySettings,
}

impl GatewayServer {
    pub fn new(settings: GatewaySettings) -> Self {
        Self { settings }
    }

    /// Build the axum [`Router`] for the configured routes and backends.
    ///
    /// Call [`start()`](Self::start) to bind and serve.
    pub fn build_app(&self) -> Result<Router, StartupError> {
        let config = self.settings.to_gateway_config();
        Ok(AppState::from_config(&config)?.into_router())
    }

    /// Bind to `0.0.0.0:{port}` and serve until Ctrl-C or SIGTERM.
    pub async fn start(self) -> Result<(), StartupError> {
        let config = self.settings.to_gateway_config();
        let app = AppState::from_config(&config)?.into_router();

        let addr = SocketAddr::from(([0, 0, 0, 0], self.settings.port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        log_banner(&listener.local_addr()?, &config);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        info!("Tollgate stopped");
        Ok(())
    }
}

fn log_banner(addr: &SocketAddr, config: &GatewayConfig) {
    info!(addr = %addr, "Tollgate gateway listening");
    for route in &config.routes {
        info!(
            route      = %route.id,
            method     = route.method.as_str(),
            pattern    = %route.path_pattern,
            target     = %route.target_service,
            visibility = route.visibility.as_str(),
            "route"
        );
    }
    for service in &config.services {
        info!(service = %service.name, base_url = %service.base_url, "backend");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received, draining connections");
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `GET /health`: composite report, `200 OK` even when degraded.
async fn health_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    extensions: Extensions,
) -> Response {
    if let Err(err) = state.throttle(&headers, &extensions).await {
        return state.reject(err);
    }
    Json(state.health.aggregate().await).into_response()
}

/// `GET /metrics`: Prometheus text format.
async fn metrics_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    extensions: Extensions,
) -> Response {
    if let Err(err) = state.throttle(&headers, &extensions).await {
        return state.reject(err);
    }
    match state.metrics.render() {
        Ok(text) => ([(header::CONTENT_TYPE, state.metrics.content_type())], text).into_response(),
        Err(e) => state.reject(ProxyError::Internal(e.to_string())),
    }
}

/// A gateway-served path called with a method it does not answer.
async fn method_not_allowed_handler(State(state): State<AppState>, method: Method) -> Response {
    state.reject(ProxyError::MethodNotAllowed(method.to_string()))
}

/// Every other request: classify, filter, forward, relay.
async fn proxy_handler(State(state): State<AppState>, request: Request) -> Response {
    match proxy(&state, request).await {
        Ok(resp) => {
            state.metrics.record_request(&resp.service, resp.status);
            into_axum_response(resp)
        }
        Err(err) => state.reject(err),
    }
}

async fn proxy(state: &AppState, request: Request) -> ProxyResult<GatewayResponse> {
    let (parts, body) = request.into_parts();
    let path = parts.uri.path().to_string();

    let method = HttpMethod::from_str_ci(parts.method.as_str());
    let route_match = method
        .as_ref()
        .and_then(|method| state.routes.classify(method, &path));
    let (Some(method), Some(route_match)) = (method, route_match) else {
        if state.routes.matches_path(&path) {
            return Err(ProxyError::MethodNotAllowed(parts.method.to_string()));
        }
        return Err(ProxyError::NotFound {
            method: parts.method.to_string(),
            path,
        });
    };

    let request_id = parts
        .headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let client = client_key(&parts.headers, peer_ip(&parts.extensions));

    // The body is only buffered once quota and credentials have passed.
    let mut req = GatewayRequest::new(request_id, method, path);
    req.query = parts.uri.query().map(str::to_string);
    req.headers = parts.headers;

    let target = route_match.target_service.clone();
    let mut ctx = GatewayContext::new(req, client).with_route(route_match);

    match state
        .pipeline
        .run_request(&mut ctx)
        .await
        .map_err(|e| ProxyError::Internal(e.to_string()))?
    {
        FilterAction::Continue => {}
        FilterAction::Reject(rejection) => return Err(rejection.into()),
        other => return Err(ProxyError::Internal(format!("unhandled filter action {other:?}"))),
    }

    ctx.request.body = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| ProxyError::PayloadTooLarge {
            limit: MAX_BODY_BYTES,
        })?;

    let mut resp = state
        .dispatcher
        .forward(&target, &ctx.request, ctx.principal.as_ref())
        .await?;
    state
        .metrics
        .observe_upstream(&target, Duration::from_millis(resp.latency_ms));

    if let Err(err) = state.pipeline.run_response(&ctx, &mut resp).await {
        warn!(
            request_id = %ctx.request.id,
            error = %err,
            "response filter pipeline error (upstream response still returned)"
        );
    }
    Ok(resp)
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn peer_ip(extensions: &Extensions) -> Option<IpAddr> {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

fn into_axum_response(resp: GatewayResponse) -> Response {
    let mut response = Response::new(Body::from(resp.body));
    *response.status_mut() = StatusCode::from_u16(resp.status).unwrap_or(StatusCode::BAD_GATEWAY);
    *response.headers_mut() = resp.headers;
    response
}
