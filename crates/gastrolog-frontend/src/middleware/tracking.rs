//! Tracking middleware: rejects new requests once the server is draining,
//! otherwise holds an [`InFlightGuard`] for the request's lifetime (design
//! §4.2 tracking middleware, §4.9 Shutdown).

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::drain::DrainController;

pub async fn tracking_middleware(
    State(drain): State<DrainController>,
    req: Request,
    next: Next,
) -> Response {
    let Some(guard) = drain.enter() else {
        return (StatusCode::SERVICE_UNAVAILABLE, "server is draining").into_response();
    };
    let response = next.run(req).await;
    drop(guard);
    response
}
