//! Plain-HTTP to HTTPS redirect (design §4.1 "HTTPS port policy"). The
//! listener manager tags each accepted connection with a [`ConnectionKind`]
//! request extension; this middleware only acts on [`ConnectionKind::Plain`]
//! connections, and only when TLS is actually configured, so serving plain
//! h2c traffic for internal/loopback use (no TLS configured at all) is
//! unaffected. Loopback hosts are passed through unredirected so developer
//! proxies (e.g. a local reverse proxy terminating TLS itself) keep working.

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

/// Tagged onto each request by the transport layer depending on which
/// listener accepted the underlying connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    Plain,
    Tls,
}

#[derive(Clone, Copy)]
pub struct RedirectPolicy {
    pub enabled: bool,
}

pub async fn redirect_middleware(
    State(policy): State<RedirectPolicy>,
    req: Request,
    next: Next,
) -> Response {
    if !policy.enabled {
        return next.run(req).await;
    }
    let is_plain = req.extensions().get::<ConnectionKind>() == Some(&ConnectionKind::Plain);
    if !is_plain {
        return next.run(req).await;
    }

    let Some(host) = req
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(|h| h.split(':').next().unwrap_or(h).to_string())
    else {
        return (StatusCode::BAD_REQUEST, "missing Host header").into_response();
    };
    if is_loopback_host(&host) {
        return next.run(req).await;
    }
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    Redirect::permanent(&format!("https://{host}{path_and_query}")).into_response()
}

fn is_loopback_host(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}
