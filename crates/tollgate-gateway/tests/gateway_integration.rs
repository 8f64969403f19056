use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use std::time::{SystemTime, UNIX_EPOCH};
use tollgate_gateway::config::GatewaySettings;
use tollgate_gateway::server::{GatewayServer, MAX_BODY_BYTES};
use tower::ServiceExt;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECRET: &str = "integration-secret";

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

fn token(secret: &str, exp: u64) -> String {
    let claims = json!({ "sub": "user-42", "email": "ada@example.com", "exp": exp });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

fn valid_bearer() -> String {
    format!("Bearer {}", token(SECRET, now() + 3600))
}

/// A URL on which nothing is listening.
fn closed_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

fn settings(auth: &str, payments: &str, notifications: &str) -> GatewaySettings {
    GatewaySettings {
        auth_service_url: auth.to_string(),
        payments_service_url: payments.to_string(),
        notifications_service_url: notifications.to_string(),
        jwt_secret: SECRET.to_string(),
        service_timeout_ms: 2_000,
        health_timeout_ms: 500,
        ..Default::default()
    }
}

fn app(settings: GatewaySettings) -> Router {
    GatewayServer::new(settings).build_app().expect("gateway app")
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    (status, headers, body.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-forwarded-for", "198.51.100.7")
        .body(Body::empty())
        .expect("request")
}

#[tokio::test]
async fn protected_route_without_token_is_unauthorized() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&backend)
        .await;
    let app = app(settings(&backend.uri(), &backend.uri(), &backend.uri()));

    let (status, _, body) = send(&app, get("/payments")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({ "statusCode": 401, "message": "Unauthorized" }));
}

#[tokio::test]
async fn expired_and_forged_tokens_get_identical_responses() {
    let backend = MockServer::start().await;
    let app = app(settings(&backend.uri(), &backend.uri(), &backend.uri()));

    let mut bodies = Vec::new();
    for bearer in [
        format!("Bearer {}", token(SECRET, now() - 60)),
        format!("Bearer {}", token("someone-elses-secret", now() + 3600)),
    ] {
        let request = Request::builder()
            .uri("/users/me")
            .header("authorization", bearer)
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        bodies.push(body);
    }
    assert_eq!(bodies[0], bodies[1]);
}

#[tokio::test]
async fn public_login_needs_no_token() {
    let auth = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_string(r#"{"email":"ada@example.com","password":"pw"}"#))
        .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"accessToken":"t"}"#))
        .expect(1)
        .mount(&auth)
        .await;
    let app = app(settings(&auth.uri(), &closed_url(), &closed_url()));

    let request = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"email":"ada@example.com","password":"pw"}"#))
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, br#"{"accessToken":"t"}"#);
}

#[tokio::test]
async fn patch_is_relayed_byte_identical_with_claims() {
    let payments = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/payments/p-17"))
        .and(body_string(r#"{"status":"refunded"}"#))
        .and(header("x-user-id", "user-42"))
        .and(header("x-user-email", "ada@example.com"))
        .respond_with(
            ResponseTemplate::new(202)
                .insert_header("x-payment-version", "3")
                .set_body_string(r#"{"id":"p-17","status":"refunded"}"#),
        )
        .expect(1)
        .mount(&payments)
        .await;
    let app = app(settings(&closed_url(), &payments.uri(), &closed_url()));

    let request = Request::builder()
        .method("PATCH")
        .uri("/payments/p-17")
        .header("authorization", valid_bearer())
        .header("content-type", "application/json")
        .body(Body::from(r#"{"status":"refunded"}"#))
        .unwrap();
    let (status, headers, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, br#"{"id":"p-17","status":"refunded"}"#);
    assert_eq!(headers.get("x-payment-version").unwrap(), "3");
    assert_eq!(headers.get("x-ratelimit-limit").unwrap(), "100");
}

#[tokio::test]
async fn backend_error_status_is_passed_through() {
    let notifications = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications/n-9"))
        .respond_with(
            ResponseTemplate::new(404).set_body_string(r#"{"message":"Notification not found"}"#),
        )
        .mount(&notifications)
        .await;
    let app = app(settings(&closed_url(), &closed_url(), &notifications.uri()));

    let request = Request::builder()
        .uri("/notifications/n-9")
        .header("authorization", valid_bearer())
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, br#"{"message":"Notification not found"}"#);
}

#[tokio::test]
async fn unreachable_backend_is_service_unavailable() {
    let app = app(settings(&closed_url(), &closed_url(), &closed_url()));

    let request = Request::builder()
        .method("POST")
        .uri("/payments")
        .header("authorization", valid_bearer())
        .body(Body::from(r#"{"amount":10}"#))
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["statusCode"], 503);
    assert_eq!(body["message"], "Service unavailable");
    assert_eq!(body["service"], "payments");
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
}

#[tokio::test]
async fn rate_limit_rejects_after_quota() {
    let auth = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&auth)
        .await;
    let app = app(GatewaySettings {
        rate_limit_max: 2,
        ..settings(&auth.uri(), &closed_url(), &closed_url())
    });

    let register = || {
        Request::builder()
            .method("POST")
            .uri("/auth/register")
            .header("x-forwarded-for", "203.0.113.50")
            .body(Body::empty())
            .unwrap()
    };

    let (first, headers, _) = send(&app, register()).await;
    assert_eq!(first, StatusCode::CREATED);
    assert_eq!(headers.get("x-ratelimit-remaining").unwrap(), "1");
    assert_eq!(send(&app, register()).await.0, StatusCode::CREATED);

    let (status, headers, body) = send(&app, register()).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    let retry: u64 = headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap();
    assert!((1..=60).contains(&retry));
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["statusCode"], 429);

    // A different client still has its full quota.
    let other = Request::builder()
        .method("POST")
        .uri("/auth/register")
        .header("x-forwarded-for", "203.0.113.51")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, other).await.0, StatusCode::CREATED);
}

fn oversized_post(uri: &str, client: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-forwarded-for", client);
    if let Some(bearer) = bearer {
        builder = builder.header("authorization", bearer);
    }
    builder
        .body(Body::from(vec![b'x'; MAX_BODY_BYTES + 1]))
        .unwrap()
}

#[tokio::test]
async fn oversized_body_without_token_is_unauthorized() {
    let app = app(settings(&closed_url(), &closed_url(), &closed_url()));

    let (status, _, _) = send(&app, oversized_post("/payments", "203.0.113.60", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn oversized_bodies_count_against_quota() {
    let app = app(GatewaySettings {
        rate_limit_max: 1,
        ..settings(&closed_url(), &closed_url(), &closed_url())
    });

    let first = send(&app, oversized_post("/auth/register", "203.0.113.61", None)).await;
    assert_eq!(first.0, StatusCode::PAYLOAD_TOO_LARGE);
    let second = send(&app, oversized_post("/auth/register", "203.0.113.61", None)).await;
    assert_eq!(second.0, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn oversized_body_with_valid_token_is_too_large() {
    let payments = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&payments)
        .await;
    let app = app(settings(&closed_url(), &payments.uri(), &closed_url()));

    let bearer = valid_bearer();
    let (status, _, body) =
        send(&app, oversized_post("/payments", "203.0.113.62", Some(&bearer))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["statusCode"], 413);
}

#[tokio::test]
async fn health_and_metrics_share_the_client_quota() {
    let app = app(GatewaySettings {
        rate_limit_max: 2,
        ..settings(&closed_url(), &closed_url(), &closed_url())
    });

    assert_eq!(send(&app, get("/health")).await.0, StatusCode::OK);
    assert_eq!(send(&app, get("/metrics")).await.0, StatusCode::OK);

    let (status, headers, _) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(headers.contains_key("retry-after"));
    assert_eq!(send(&app, get("/metrics")).await.0, StatusCode::TOO_MANY_REQUESTS);

    // A different client still gets its report.
    let other = Request::builder()
        .uri("/health")
        .header("x-forwarded-for", "198.51.100.8")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, other).await.0, StatusCode::OK);
}

async fn mount_health(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":"ok"}"#))
        .mount(server)
        .await;
}

#[tokio::test]
async fn health_is_healthy_when_every_backend_answers() {
    let auth = MockServer::start().await;
    let payments = MockServer::start().await;
    let notifications = MockServer::start().await;
    for server in [&auth, &payments, &notifications] {
        mount_health(server).await;
    }
    let app = app(settings(&auth.uri(), &payments.uri(), &notifications.uri()));

    let (status, _, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["overall"], "healthy");
    assert_eq!(body["gateway"]["status"], "ok");
    for name in ["auth", "payments", "notifications"] {
        assert_eq!(body["services"][name]["status"], "ok");
        assert!(body["services"][name]["latencyMs"].is_u64());
    }
}

#[tokio::test]
async fn health_is_degraded_but_still_ok_when_a_backend_is_down() {
    let auth = MockServer::start().await;
    let payments = MockServer::start().await;
    mount_health(&auth).await;
    mount_health(&payments).await;
    let app = app(settings(&auth.uri(), &payments.uri(), &closed_url()));

    let (status, _, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["overall"], "degraded");
    assert_eq!(body["services"]["auth"]["status"], "ok");
    assert_eq!(
        body["services"]["notifications"],
        json!({ "status": "error", "message": "Service unavailable" })
    );
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let app = app(settings(&closed_url(), &closed_url(), &closed_url()));

    let (status, _, body) = send(&app, get("/invoices/1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["statusCode"], 404);
    assert_eq!(body["message"], "Cannot GET /invoices/1");
}

#[tokio::test]
async fn unknown_path_with_unsupported_method_is_not_found() {
    let app = app(settings(&closed_url(), &closed_url(), &closed_url()));

    let request = Request::builder()
        .method("TRACE")
        .uri("/invoices/1")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["message"], "Cannot TRACE /invoices/1");
}

#[tokio::test]
async fn wrong_method_on_gateway_endpoint_gets_error_body() {
    let app = app(settings(&closed_url(), &closed_url(), &closed_url()));

    let request = Request::builder()
        .method("POST")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["statusCode"], 405);
}

#[tokio::test]
async fn unsupported_method_is_rejected() {
    let app = app(settings(&closed_url(), &closed_url(), &closed_url()));

    let request = Request::builder()
        .method("TRACE")
        .uri("/payments")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn metrics_count_answered_requests() {
    let app = app(settings(&closed_url(), &closed_url(), &closed_url()));
    let _ = send(&app, get("/payments")).await;

    let (status, headers, body) = send(&app, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    let content_type = headers
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("text/plain"));
    assert!(content_type.contains("charset=utf-8"));

    let text = String::from_utf8(body).unwrap();
    assert!(text.contains(r#"tollgate_requests_total{service="gateway",status="401"} 1"#));
    assert!(text.contains(r#"tollgate_rejections_total{reason="unauthenticated"} 1"#));
}
