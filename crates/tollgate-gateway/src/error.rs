//! Gateway runtime error types.
//!
//! [`ProxyError`] is every failure the gateway itself originates.  Errors a
//! backend reports (status ≥ 400) are not errors here: they are relayed
//! verbatim as ordinary responses.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tollgate_kernel::{GatewayError, Rejection};

/// Gateway-originated request failures.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Cannot {method} {path}")]
    NotFound { method: String, path: String },

    #[error("method '{0}' is not supported")]
    MethodNotAllowed(String),

    #[error("Unauthorized")]
    Unauthenticated,

    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("service '{service}' unavailable: {cause}")]
    UpstreamUnavailable { service: String, cause: String },

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::NotFound { .. } => StatusCode::NOT_FOUND,
            ProxyError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ProxyError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ProxyError::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used for the `reason` metric dimension.
    pub fn reason(&self) -> &'static str {
        match self {
            ProxyError::NotFound { .. } => "not_found",
            ProxyError::MethodNotAllowed(_) => "method_not_allowed",
            ProxyError::Unauthenticated => "unauthenticated",
            ProxyError::RateLimited { .. } => "rate_limited",
            ProxyError::UpstreamUnavailable { .. } => "upstream_unavailable",
            ProxyError::PayloadTooLarge { .. } => "payload_too_large",
            ProxyError::Internal(_) => "internal",
        }
    }
}

impl From<Rejection> for ProxyError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::Unauthenticated => ProxyError::Unauthenticated,
            Rejection::RateLimited { retry_after_secs } => {
                ProxyError::RateLimited { retry_after_secs }
            }
            other => ProxyError::Internal(format!("unhandled rejection {other:?}")),
        }
    }
}

/// Uniform body for gateway-originated errors.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    status_code: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    service: Option<String>,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, error, service) = match &self {
            ProxyError::NotFound { .. } => (self.to_string(), Some("Not Found".to_string()), None),
            ProxyError::MethodNotAllowed(_) => (
                self.to_string(),
                Some("Method Not Allowed".to_string()),
                None,
            ),
            ProxyError::Unauthenticated => ("Unauthorized".to_string(), None, None),
            ProxyError::RateLimited { .. } => ("Too Many Requests".to_string(), None, None),
            ProxyError::UpstreamUnavailable { service, cause } => (
                "Service unavailable".to_string(),
                Some(cause.clone()),
                Some(service.clone()),
            ),
            ProxyError::PayloadTooLarge { .. } => (
                self.to_string(),
                Some("Payload Too Large".to_string()),
                None,
            ),
            ProxyError::Internal(_) => ("Internal server error".to_string(), None, None),
        };

        let body = ErrorBody {
            status_code: status.as_u16(),
            message,
            error,
            service,
        };
        let mut response = (status, Json(body)).into_response();

        if let ProxyError::RateLimited { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}

pub type ProxyResult<T> = Result<T, ProxyError>;

/// Failures that stop the gateway from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid gateway configuration: {0}")]
    Config(#[from] GatewayError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("failed to register metrics: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("failed to bind listener: {0}")]
    Io(#[from] std::io::Error),
}
