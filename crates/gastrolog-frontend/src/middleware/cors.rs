//! CORS middleware (design §4.2). Implemented as a plain `from_fn`
//! middleware rather than `tower_http::cors::CorsLayer` so the OPTIONS
//! short-circuit can return exactly `204` with no body, matching the
//! contract precisely; an arbitrary origin is never reflected back.

use axum::extract::Request;
use axum::http::header::{self, HeaderValue};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";
const ALLOWED_HEADERS: &str = "Authorization, Content-Type, Connect-Protocol-Version, Connect-Timeout-Ms, Grpc-Timeout, X-Grpc-Web, X-User-Agent";
const EXPOSED_HEADERS: &str = "Grpc-Status, Grpc-Message, Grpc-Status-Details-Bin";
const MAX_AGE_SECS: &str = "86400";

fn is_loopback_host(host: &str) -> bool {
    let host = host.split(':').next().unwrap_or(host);
    let host = host.trim_start_matches('[').trim_end_matches(']');
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}

/// An origin is allowed when it's same-origin (its host matches the
/// request's `Host` header) or both the request host and the origin host
/// are loopback addresses (design §4.2).
fn origin_allowed(origin_str: &str, request_host: Option<&str>) -> bool {
    let origin_host = origin_str
        .strip_prefix("http://")
        .or_else(|| origin_str.strip_prefix("https://"))
        .unwrap_or(origin_str);
    let origin_host_only = origin_host.split(':').next().unwrap_or(origin_host);

    match request_host {
        Some(host) => {
            let host_only = host.split(':').next().unwrap_or(host);
            host_only == origin_host_only || (is_loopback_host(host) && is_loopback_host(origin_host))
        }
        None => false,
    }
}

pub async fn cors_middleware(req: Request, next: Next) -> Response {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let request_host = req
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let allow = origin
        .as_deref()
        .map(|o| origin_allowed(o, request_host.as_deref()))
        .unwrap_or(false);

    if req.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        apply_cors_headers(response.headers_mut(), allow, origin.as_deref());
        return response;
    }

    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut(), allow, origin.as_deref());
    response
}

fn apply_cors_headers(headers: &mut axum::http::HeaderMap, allow: bool, origin: Option<&str>) {
    if allow {
        if let Some(origin) = origin.and_then(|o| HeaderValue::from_str(o).ok()) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        }
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static(EXPOSED_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static(MAX_AGE_SECS),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_origin_is_allowed() {
        assert!(origin_allowed("https://example.com", Some("example.com")));
    }

    #[test]
    fn loopback_both_sides_is_allowed() {
        assert!(origin_allowed("http://localhost:3000", Some("127.0.0.1:8080")));
    }

    #[test]
    fn cross_origin_non_loopback_is_rejected() {
        assert!(!origin_allowed("https://evil.example", Some("example.com")));
    }

    #[test]
    fn missing_host_rejects() {
        assert!(!origin_allowed("https://example.com", None));
    }
}
