//! The error taxonomy of design §7.
//!
//! This is a concept, not a single type forced on every caller: handlers
//! classify whatever underlying error they hit into one of these variants,
//! attaching a concise caller-facing message. Internal detail (config-store
//! IO errors, panics inside the query engine) never crosses the boundary —
//! it gets logged and folded into `Internal`.

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum FrontendError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("canceled")]
    Canceled,

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl FrontendError {
    pub fn internal(err: impl std::fmt::Display) -> FrontendError {
        FrontendError::Internal(err.to_string())
    }
}
