//! Axum wiring for [`RateLimiter`] (design §4.2 rate-limit middleware).
//!
//! Only the exact Login/Register procedure paths are rate-limited; every
//! other path passes straight through.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::rate_limit::{client_ip, RateLimiter};

const LIMITED_PATHS: [&str; 2] = [
    "/gastrolog.AuthService/Login",
    "/gastrolog.AuthService/Register",
];

pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Response {
    if !LIMITED_PATHS.contains(&req.uri().path()) {
        return next.run(req).await;
    }

    let ip = client_ip(&addr.to_string());
    if limiter.allow(&ip) {
        return next.run(req).await;
    }

    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        r#"{"code":"resource_exhausted","message":"too many requests, try again later"}"#,
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from_static("60"));
    response
}
