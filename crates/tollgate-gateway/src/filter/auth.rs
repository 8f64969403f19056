//! Bearer-token (JWT) authentication filter.
//!
//! Protected routes require `Authorization: Bearer <token>` where the token
//! is an HS256 JWT signed with the gateway's shared secret and not yet
//! expired.  Public routes skip the check entirely.
//!
//! Every failure (missing header, malformed token, bad signature, expiry)
//! produces the same [`Rejection::Unauthenticated`]; the concrete reason is
//! only logged.

use async_trait::async_trait;
use http::header::AUTHORIZATION;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tollgate_kernel::{
    FilterAction, FilterError, FilterOrder, GatewayContext, GatewayFilter, GatewayRequest,
    Principal, Rejection,
};
use tracing::debug;

/// Claims the identity service puts in its access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    #[serde(default)]
    pub email: String,
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
}

/// Internal reason a token was refused.  Never sent to the caller.
#[derive(Debug, Error)]
pub enum AuthFailure {
    #[error("missing Authorization header")]
    MissingHeader,
    #[error("Authorization header is not a bearer token")]
    NotBearer,
    #[error("token rejected: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

/// Authentication filter that verifies HS256 bearer tokens.
pub struct JwtAuthFilter {
    key: DecodingKey,
    validation: Validation,
}

impl JwtAuthFilter {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verify the bearer token on `req` and turn its claims into a principal.
    pub fn authenticate(&self, req: &GatewayRequest) -> Result<Principal, AuthFailure> {
        let header = req
            .header(AUTHORIZATION.as_str())
            .ok_or(AuthFailure::MissingHeader)?;
        let token = bearer_token(header).ok_or(AuthFailure::NotBearer)?;

        let data = decode::<TokenClaims>(token, &self.key, &self.validation)?;
        Ok(Principal {
            subject_id: data.claims.sub,
            email: data.claims.email,
            token_expiry: data.claims.exp,
        })
    }
}

/// Extract the token from a `Bearer <token>` header value.  The scheme is
/// matched case-insensitively.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl GatewayFilter for JwtAuthFilter {
    fn name(&self) -> &str {
        "jwt-auth"
    }

    fn order(&self) -> FilterOrder {
        FilterOrder::AUTH
    }

    async fn on_request(&self, ctx: &mut GatewayContext) -> Result<FilterAction, FilterError> {
        if !ctx.requires_auth() {
            return Ok(FilterAction::Continue);
        }

        match self.authenticate(&ctx.request) {
            Ok(principal) => {
                ctx.principal = Some(principal);
                Ok(FilterAction::Continue)
            }
            Err(reason) => {
                debug!(request_id = %ctx.request.id, reason = %reason, "rejected request");
                Ok(FilterAction::Reject(Rejection::Unauthenticated))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use std::time::{SystemTime, UNIX_EPOCH};
    use tollgate_kernel::{HttpMethod, RouteMatch, Visibility};

    const SECRET: &str = "test-secret";

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    fn token(secret: &str, exp: u64) -> String {
        let claims = TokenClaims {
            sub: "user-7".into(),
            email: "seven@example.com".into(),
            exp,
            iat: Some(now()),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn ctx(visibility: Visibility, auth: Option<&str>) -> GatewayContext {
        let mut req = GatewayRequest::new("req-1", HttpMethod::Get, "/payments");
        if let Some(v) = auth {
            req = req.with_header("authorization", v);
        }
        GatewayContext::new(req, "1.2.3.4").with_route(RouteMatch {
            route_id: "payments-root".into(),
            target_service: "payments".into(),
            visibility,
            captured: None,
        })
    }

    #[tokio::test]
    async fn valid_token_attaches_principal() {
        let filter = JwtAuthFilter::new(SECRET);
        let bearer = format!("Bearer {}", token(SECRET, now() + 3600));
        let mut c = ctx(Visibility::Protected, Some(&bearer));

        assert_eq!(filter.on_request(&mut c).await.unwrap(), FilterAction::Continue);
        let p = c.principal.unwrap();
        assert_eq!(p.subject_id, "user-7");
        assert_eq!(p.email, "seven@example.com");
    }

    #[tokio::test]
    async fn scheme_is_case_insensitive() {
        let filter = JwtAuthFilter::new(SECRET);
        let bearer = format!("bearer {}", token(SECRET, now() + 3600));
        let mut c = ctx(Visibility::Protected, Some(&bearer));
        assert_eq!(filter.on_request(&mut c).await.unwrap(), FilterAction::Continue);
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        let filter = JwtAuthFilter::new(SECRET);
        let mut c = ctx(Visibility::Protected, None);
        assert_eq!(
            filter.on_request(&mut c).await.unwrap(),
            FilterAction::Reject(Rejection::Unauthenticated)
        );
        assert!(c.principal.is_none());
    }

    #[tokio::test]
    async fn expired_and_forged_tokens_are_rejected_alike() {
        let filter = JwtAuthFilter::new(SECRET);

        let expired = format!("Bearer {}", token(SECRET, now() - 10));
        let forged = format!("Bearer {}", token("other-secret", now() + 3600));

        for bearer in [expired, forged] {
            let mut c = ctx(Visibility::Protected, Some(&bearer));
            assert_eq!(
                filter.on_request(&mut c).await.unwrap(),
                FilterAction::Reject(Rejection::Unauthenticated)
            );
        }
    }

    #[test]
    fn authenticate_reports_internal_reason() {
        let filter = JwtAuthFilter::new(SECRET);
        let req = GatewayRequest::new("r", HttpMethod::Get, "/users")
            .with_header("authorization", "Basic dXNlcjpwYXNz");
        assert!(matches!(filter.authenticate(&req), Err(AuthFailure::NotBearer)));

        let req = GatewayRequest::new("r", HttpMethod::Get, "/users")
            .with_header("authorization", "Bearer not-a-jwt");
        assert!(matches!(filter.authenticate(&req), Err(AuthFailure::InvalidToken(_))));
    }

    #[tokio::test]
    async fn public_route_skips_verification() {
        let filter = JwtAuthFilter::new(SECRET);
        let mut c = ctx(Visibility::Public, Some("Bearer garbage"));
        assert_eq!(filter.on_request(&mut c).await.unwrap(), FilterAction::Continue);
        assert!(c.principal.is_none());
    }

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("  BEARER   abc "), Some("abc"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Token abc"), None);
        assert_eq!(bearer_token("abc"), None);
    }
}
