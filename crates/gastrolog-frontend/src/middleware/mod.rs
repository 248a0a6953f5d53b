//! The middleware chain (design §4.2), applied outermost-to-innermost as:
//! tracking -> CORS -> security headers -> rate limit -> compression ->
//! service mux. The redirect middleware sits outside tracking, and only on
//! the plain-HTTP listener (design §4.1) -- see [`transport`](crate::transport).

pub mod compression;
pub mod cors;
pub mod rate_limit;
pub mod redirect;
pub mod security_headers;
pub mod tracking;

pub use compression::compression_middleware;
pub use cors::cors_middleware;
pub use rate_limit::rate_limit_middleware;
pub use redirect::{redirect_middleware, ConnectionKind, RedirectPolicy};
pub use security_headers::security_headers_middleware;
pub use tracking::tracking_middleware;
