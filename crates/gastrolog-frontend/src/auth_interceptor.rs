//! The authentication interceptor (design §4.3): classifies procedures into
//! public and protected, verifies bearer tokens on protected ones, and
//! propagates [`Claims`] to handlers via a request extension.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use gastrolog_auth::{AuthError, TokenService, TokenValidator, UserLookup};
use gastrolog_config_api::ConfigStore;
use gastrolog_repr::{Claims, Role, User};
use uuid::Uuid;

const UNCONDITIONALLY_PUBLIC: &[&str] = &[
    "/gastrolog.AuthService/GetAuthStatus",
    "/gastrolog.AuthService/Login",
    "/gastrolog.LifecycleService/Health",
];

fn is_unconditionally_public(path: &str) -> bool {
    UNCONDITIONALLY_PUBLIC.contains(&path)
        || path == "/healthz"
        || path == "/readyz"
        || path == "/metrics"
}

const REGISTER_PATH: &str = "/gastrolog.AuthService/Register";

/// Adapts a [`ConfigStore`] handle to the narrower [`UserLookup`] contract
/// `gastrolog-auth` depends on, so that crate never needs to know about
/// config storage.
pub struct ConfigStoreUserLookup {
    pub store: Arc<dyn ConfigStore>,
}

#[async_trait]
impl UserLookup for ConfigStoreUserLookup {
    async fn find_user(&self, user_id: Uuid) -> Option<User> {
        self.store.get_user(user_id).await
    }
}

/// Shared state for the auth interceptor middleware.
#[derive(Clone)]
pub struct AuthInterceptorState {
    pub tokens: Arc<TokenService>,
    pub store: Arc<dyn ConfigStore>,
    /// Development-only bypass (design §4.3 "No-auth mode"): every request
    /// is granted synthetic admin claims without ever consulting a token.
    pub no_auth: bool,
}

fn synthetic_admin_claims() -> Claims {
    Claims {
        user_id: Uuid::nil(),
        username: "dev-admin".to_string(),
        role: Role::Admin,
        issued_at: Utc::now(),
    }
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn unauthenticated() -> Response {
    (axum::http::StatusCode::UNAUTHORIZED, "unauthenticated").into_response()
}

pub async fn auth_interceptor_middleware(
    State(state): State<AuthInterceptorState>,
    mut req: Request,
    next: Next,
) -> Response {
    if state.no_auth {
        req.extensions_mut().insert(synthetic_admin_claims());
        return next.run(req).await;
    }

    let path = req.uri().path().to_string();

    if is_unconditionally_public(&path) {
        return next.run(req).await;
    }
    // Bootstrap rule (design §4.3 step 5, §6): Register is public exactly
    // until the first user is created.
    if path == REGISTER_PATH && state.store.user_count().await == 0 {
        return next.run(req).await;
    }

    let Some(token) = bearer_token(&req) else {
        return unauthenticated();
    };

    let claims = match state.tokens.verify(token) {
        Ok(claims) => claims,
        Err(AuthError::Unauthenticated) => return unauthenticated(),
        Err(AuthError::Internal(_)) => return unauthenticated(),
    };

    let validator = TokenValidator::new(ConfigStoreUserLookup {
        store: state.store.clone(),
    });
    let claims = match validator.validate(claims).await {
        Ok(claims) => claims,
        Err(_) => return unauthenticated(),
    };

    req.extensions_mut().insert(claims);
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_auth_status_and_login_are_unconditionally_public() {
        assert!(is_unconditionally_public("/gastrolog.AuthService/GetAuthStatus"));
        assert!(is_unconditionally_public("/gastrolog.AuthService/Login"));
        assert!(is_unconditionally_public("/gastrolog.LifecycleService/Health"));
        assert!(!is_unconditionally_public("/gastrolog.AuthService/Register"));
        assert!(!is_unconditionally_public("/gastrolog.QueryService/Search"));
    }
}
