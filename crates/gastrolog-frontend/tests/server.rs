//! Integration tests for the frontend's shared handler (design §8).
//!
//! Drives [`gastrolog_frontend::transport::build_handler`] directly with
//! `tower::ServiceExt::oneshot` instead of binding a real listener, matching
//! the `materialized/tests/server.rs` convention of exercising the server
//! end to end without depending on any particular transport.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::Duration as ChronoDuration;
use gastrolog_auth::TokenService;
use gastrolog_config_api::memory::InMemoryConfigStore;
use gastrolog_frontend::config::FrontendConfig;
use gastrolog_frontend::state::AppState;
use gastrolog_frontend::transport::build_handler;
use gastrolog_orchestrator_api::memory::InMemoryOrchestrator;
use tower::ServiceExt;

fn test_config(no_auth: bool) -> FrontendConfig {
    FrontendConfig {
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        https_listen_addr: None,
        redirect_to_https: false,
        node_id: "test-node".to_string(),
        peers: Vec::new(),
        jwt_secret: Some("integration-test-secret".to_string()),
        token_ttl: Duration::from_secs(3600),
        no_auth,
        rate_limit_stale_after: Duration::from_secs(300),
        rate_limit_cleanup_interval: Duration::from_secs(180),
        cors_allowed_origins: Vec::new(),
        drain_timeout: Duration::from_secs(5),
        log_format: "pretty".to_string(),
        query_timeout: None,
        max_follow_duration: Duration::from_secs(60),
        tls_cert_path: None,
        tls_key_path: None,
    }
}

fn test_state(no_auth: bool) -> AppState {
    let config = test_config(no_auth);
    let orchestrator = Arc::new(InMemoryOrchestrator::new(config.node_id.clone()));
    let config_store = Arc::new(InMemoryConfigStore::new());
    let tokens = Arc::new(TokenService::new(
        config.jwt_secret.as_deref().unwrap().as_bytes(),
        ChronoDuration::from_std(config.token_ttl).unwrap(),
    ));
    AppState::new(&config, orchestrator, config_store, tokens)
}

fn get(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn healthz_returns_ok() {
    let app = build_handler(test_state(true));
    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn readyz_is_ok_until_draining() {
    let state = test_state(true);
    let app = build_handler(state.clone());
    let response = app.clone().oneshot(get("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    state.drain.request_shutdown(true);
    let response = app.oneshot(get("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn metrics_returns_prometheus_text_format() {
    let app = build_handler(test_state(true));
    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn unmatched_path_is_a_bare_404() {
    let app = build_handler(test_state(true));
    let response = app.oneshot(get("/not-a-real-endpoint")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn draining_rejects_new_requests_with_503() {
    let state = test_state(true);
    state.drain.request_shutdown(true);
    let app = build_handler(state);
    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn security_headers_are_present_on_every_response() {
    let app = build_handler(test_state(true));
    let response = app.oneshot(get("/healthz")).await.unwrap();
    let headers = response.headers();
    assert_eq!(
        headers.get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    // No TLS connection tag on this request, so no HSTS header.
    assert!(headers.get("strict-transport-security").is_none());
}

#[tokio::test]
async fn cors_preflight_from_same_origin_is_allowed() {
    let app = build_handler(test_state(true));
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/gastrolog.LifecycleService/Health")
        .header(axum::http::header::ORIGIN, "https://example.com")
        .header(axum::http::header::HOST, "example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response
            .headers()
            .get(axum::http::header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "https://example.com"
    );
}

#[tokio::test]
async fn cors_preflight_from_cross_origin_is_not_reflected() {
    let app = build_handler(test_state(true));
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/gastrolog.LifecycleService/Health")
        .header(axum::http::header::ORIGIN, "https://evil.example")
        .header(axum::http::header::HOST, "example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response
        .headers()
        .get(axum::http::header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn protected_rpc_without_a_bearer_token_is_unauthenticated() {
    // no_auth = false, so the auth interceptor actually enforces tokens.
    let app = build_handler(test_state(false));
    let request = Request::builder()
        .method(Method::POST)
        .uri("/gastrolog.JobService/ListJobs")
        .header(axum::http::header::CONTENT_TYPE, "application/grpc")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn no_auth_mode_bypasses_the_interceptor() {
    // With no_auth, even a protected path is let through by the interceptor
    // (though it may still fail downstream without a properly framed gRPC
    // body); what matters here is it isn't rejected at 401.
    let app = build_handler(test_state(true));
    let request = Request::builder()
        .method(Method::POST)
        .uri("/gastrolog.JobService/ListJobs")
        .header(axum::http::header::CONTENT_TYPE, "application/grpc")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_ne!(response.status(), StatusCode::UNAUTHORIZED);
}
