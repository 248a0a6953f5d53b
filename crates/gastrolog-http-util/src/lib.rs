//! HTTP helpers used by `gastrolog-frontend` that have nothing to do with
//! any one RPC service: CORS policy construction, Prometheus exposition,
//! liveness/readiness handlers, and a macro for serving an embedded static
//! frontend. Grounded on the upstream codebase's own `http-util` crate.

use axum::http::request::Parts;
use axum::http::{HeaderValue, StatusCode};
use axum::response::IntoResponse;
use gastrolog_ore::metrics::MetricsRegistry;
use tower_http::cors::AllowOrigin;

/// Constructs a CORS `AllowOrigin` policy. If any bare `"*"` is present,
/// allows any origin; otherwise allows exact matches and `*.`-prefixed
/// wildcard subdomains.
pub fn build_cors_allowed_origin<'a, I>(allowed: I) -> AllowOrigin
where
    I: IntoIterator<Item = &'a HeaderValue>,
{
    let allowed: Vec<HeaderValue> = allowed.into_iter().cloned().collect();
    if allowed.iter().any(|o| o.as_bytes() == b"*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::predicate(move |origin: &HeaderValue, _parts: &Parts| {
            allowed.iter().any(|val| {
                (val.as_bytes().starts_with(b"*.") && origin.as_bytes().ends_with(&val.as_bytes()[1..]))
                    || origin == val
            })
        })
    }
}

/// `/healthz`: always 200. Unauthenticated (design §4.9).
pub async fn handle_liveness_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Renders the current metric set in Prometheus text exposition format for
/// `/metrics`.
pub fn encode_prometheus(registry: &MetricsRegistry) -> Result<Vec<u8>, prometheus::Error> {
    registry.encode()
}

/// Generates a `handle_static` Axum handler that serves an embedded static
/// directory at the frontend's root path, mirroring the upstream
/// `make_handle_static!` macro. Content outside the embedded set falls
/// through to a 404 so the caller's router can chain further fallbacks.
#[macro_export]
macro_rules! make_handle_static {
    ($static_dir:expr) => {
        pub async fn handle_static(
            path: ::axum::extract::Path<String>,
        ) -> impl ::axum::response::IntoResponse {
            const STATIC_DIR: ::include_dir::Dir = $static_dir;
            let path = path.strip_prefix('/').unwrap_or(&path);
            let content_type = match ::std::path::Path::new(path)
                .extension()
                .and_then(|e| e.to_str())
            {
                Some("js") => "text/javascript",
                Some("css") => "text/css",
                Some("html") => "text/html",
                Some("svg") => "image/svg+xml",
                _ => "application/octet-stream",
            };
            match STATIC_DIR.get_file(path) {
                Some(f) => Ok((
                    [(::axum::http::header::CONTENT_TYPE, content_type)],
                    f.contents(),
                )),
                None => Err((::axum::http::StatusCode::NOT_FOUND, "not found")),
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_without_panicking_for_wildcard_and_exact() {
        let star = HeaderValue::from_static("*");
        let _ = build_cors_allowed_origin([&star]);
        let exact = HeaderValue::from_static("https://example.com");
        let _ = build_cors_allowed_origin([&exact]);
    }
}
