//! Reverse-proxy dispatcher.
//!
//! [`Dispatcher`] forwards a classified request to `{base_url}{path}` of the
//! target service and relays the response verbatim.  It never parses or
//! rewrites bodies, never retries, and treats any upstream status (including
//! 4xx/5xx) as a successful relay.  Only a call that cannot complete
//! (refused, DNS failure, past the service's call timeout) becomes
//! [`ProxyError::UpstreamUnavailable`].

use crate::error::{ProxyError, ProxyResult};
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::sync::Arc;
use std::time::Instant;
use tollgate_kernel::{GatewayRequest, GatewayResponse, Principal, ServiceRegistry};
use tracing::{debug, instrument, warn};

/// Subject id of the authenticated caller, set by the gateway.
pub const USER_ID_HEADER: &str = "x-user-id";
/// E-mail of the authenticated caller, set by the gateway.
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Headers that describe a single transport hop and must not be forwarded.
/// `content-length` is recomputed by the HTTP client.
const HOP_BY_HOP: [&str; 10] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// Forwards requests to backends resolved through the service registry.
pub struct Dispatcher {
    client: Client,
    registry: Arc<dyn ServiceRegistry>,
}

impl Dispatcher {
    /// Create a dispatcher sharing one pooled HTTP client across all calls.
    pub fn new(client: Client, registry: Arc<dyn ServiceRegistry>) -> Self {
        Self { client, registry }
    }

    /// Build the header set sent upstream.
    ///
    /// Inbound copies of the claim headers are always dropped so a caller
    /// cannot impersonate another user on a public route.
    fn upstream_headers(req: &GatewayRequest, principal: Option<&Principal>) -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(req.headers.len() + 3);
        for (name, value) in &req.headers {
            if is_hop_by_hop(name) || name == USER_ID_HEADER || name == USER_EMAIL_HEADER {
                continue;
            }
            headers.append(name.clone(), value.clone());
        }

        if !headers.contains_key(header::CONTENT_TYPE) {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }
        if !headers.contains_key(REQUEST_ID_HEADER) {
            if let Ok(v) = HeaderValue::from_str(&req.id) {
                headers.insert(REQUEST_ID_HEADER, v);
            }
        }
        if let Some(p) = principal {
            if let Ok(v) = HeaderValue::from_str(&p.subject_id) {
                headers.insert(USER_ID_HEADER, v);
            }
            if let Ok(v) = HeaderValue::from_str(&p.email) {
                headers.insert(USER_EMAIL_HEADER, v);
            }
        }
        headers
    }

    /// Forward `req` to `service` and return the backend's answer unchanged.
    #[instrument(skip(self, req, principal), fields(request_id = %req.id, method = req.method.as_str(), path = %req.path))]
    pub async fn forward(
        &self,
        service: &str,
        req: &GatewayRequest,
        principal: Option<&Principal>,
    ) -> ProxyResult<GatewayResponse> {
        let entry = self
            .registry
            .lookup(service)
            .ok_or_else(|| ProxyError::Internal(format!("service '{service}' is not registered")))?;

        let url = entry.url_for(&req.path_and_query());
        debug!(url = %url, "forwarding to backend");

        let mut builder = self
            .client
            .request(req.method.into(), &url)
            .headers(Self::upstream_headers(req, principal))
            .timeout(entry.call_timeout());
        if !req.body.is_empty() {
            builder = builder.body(req.body.clone());
        }

        let start = Instant::now();
        let unavailable = |e: reqwest::Error| {
            let cause = describe(&e, entry.call_timeout_ms);
            warn!(service = %service, url = %url, error = %cause, "backend unreachable");
            ProxyError::UpstreamUnavailable {
                service: service.to_string(),
                cause,
            }
        };

        let upstream = builder.send().await.map_err(unavailable)?;
        let status = upstream.status().as_u16();

        let mut headers = HeaderMap::with_capacity(upstream.headers().len());
        for (name, value) in upstream.headers() {
            if !is_hop_by_hop(name) {
                headers.append(name.clone(), value.clone());
            }
        }

        let body = upstream.bytes().await.map_err(unavailable)?;
        let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        if status >= 400 {
            debug!(status, "backend reported an error, relaying unchanged");
        }

        let mut resp = GatewayResponse::new(status, service).with_body(body);
        resp.headers = headers;
        resp.latency_ms = latency_ms;
        Ok(resp)
    }
}

/// Human-readable cause for a failed upstream call.
fn describe(e: &reqwest::Error, timeout_ms: u64) -> String {
    if e.is_timeout() {
        return format!("timeout of {timeout_ms}ms exceeded");
    }
    // The innermost source carries the useful detail ("Connection refused",
    // "failed to lookup address information", ...).
    let mut source: &dyn std::error::Error = e;
    while let Some(next) = source.source() {
        source = next;
    }
    source.to_string()
}
