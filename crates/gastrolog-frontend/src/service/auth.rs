//! `AuthService` (design §4.10): registration, login, password change and
//! session invalidation.

use chrono::Utc;
use gastrolog_auth::{hash_password, verify_password};
use gastrolog_proto::gen::auth_service_server::AuthService;
use gastrolog_proto::gen::{
    ChangePasswordRequest, ChangePasswordResponse, GetAuthStatusRequest, GetAuthStatusResponse,
    LoginRequest, LoginResponse, LogoutAllRequest, LogoutAllResponse, LogoutRequest, LogoutResponse,
    RegisterRequest, RegisterResponse,
};
use gastrolog_repr::{Claims, FrontendError, Role, User};
use tonic::{Request, Response, Status};
use uuid::Uuid;

use crate::state::AppState;

pub struct AuthServiceImpl {
    pub state: AppState,
}

fn require_claims(request: &Request<impl Send>) -> Result<Claims, Status> {
    request
        .extensions()
        .get::<Claims>()
        .cloned()
        .ok_or_else(|| FrontendError::Unauthenticated.into())
}

fn validate_password(password: &str) -> Result<(), FrontendError> {
    if password.chars().count() < 8 {
        return Err(FrontendError::InvalidArgument(
            "password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}

#[tonic::async_trait]
impl AuthService for AuthServiceImpl {
    async fn get_auth_status(
        &self,
        request: Request<GetAuthStatusRequest>,
    ) -> Result<Response<GetAuthStatusResponse>, Status> {
        let has_users = self.state.config_store.user_count().await > 0;
        let authenticated = request.extensions().get::<Claims>().is_some();
        Ok(Response::new(GetAuthStatusResponse {
            has_users,
            authenticated,
        }))
    }

    async fn register(&self, request: Request<RegisterRequest>) -> Result<Response<RegisterResponse>, Status> {
        let req = request.into_inner();
        User::validate_username(&req.username).map_err(FrontendError::InvalidArgument)?;
        validate_password(&req.password)?;

        if self
            .state
            .config_store
            .get_user_by_username(&req.username)
            .await
            .is_some()
        {
            return Err(FrontendError::AlreadyExists(format!("user {} already exists", req.username)).into());
        }

        // First user becomes admin (design §4.10).
        let role = if self.state.config_store.user_count().await == 0 {
            Role::Admin
        } else {
            Role::User
        };
        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(),
            username: req.username.clone(),
            password_hash: hash_password(&req.password).map_err(FrontendError::internal)?,
            role,
            token_invalidated_at: now - chrono::Duration::seconds(1),
        };
        self.state.config_store.create_user(user.clone()).await?;

        let token = self
            .state
            .tokens
            .mint(user.id, &user.username, user.role, now)
            .map_err(FrontendError::internal)?;
        Ok(Response::new(RegisterResponse { token }))
    }

    async fn login(&self, request: Request<LoginRequest>) -> Result<Response<LoginResponse>, Status> {
        let req = request.into_inner();
        // Same rejection for unknown user and wrong password to prevent
        // username enumeration (design §4.10).
        let user = self
            .state
            .config_store
            .get_user_by_username(&req.username)
            .await
            .ok_or(FrontendError::Unauthenticated)?;
        if !verify_password(&req.password, &user.password_hash) {
            return Err(FrontendError::Unauthenticated.into());
        }
        let now = Utc::now();
        let token = self
            .state
            .tokens
            .mint(user.id, &user.username, user.role, now)
            .map_err(FrontendError::internal)?;
        Ok(Response::new(LoginResponse { token }))
    }

    async fn change_password(
        &self,
        request: Request<ChangePasswordRequest>,
    ) -> Result<Response<ChangePasswordResponse>, Status> {
        let claims = require_claims(&request)?;
        let req = request.into_inner();
        let mut user = self
            .state
            .config_store
            .get_user(claims.user_id)
            .await
            .ok_or(FrontendError::Unauthenticated)?;
        if !verify_password(&req.old_password, &user.password_hash) {
            return Err(FrontendError::Unauthenticated.into());
        }
        validate_password(&req.new_password)?;
        user.password_hash = hash_password(&req.new_password).map_err(FrontendError::internal)?;
        user.token_invalidated_at = Utc::now();
        self.state.config_store.update_user(user).await?;
        Ok(Response::new(ChangePasswordResponse {}))
    }

    async fn logout(&self, request: Request<LogoutRequest>) -> Result<Response<LogoutResponse>, Status> {
        let claims = require_claims(&request)?;
        invalidate_tokens(&self.state, claims.user_id).await?;
        Ok(Response::new(LogoutResponse {}))
    }

    async fn logout_all(
        &self,
        request: Request<LogoutAllRequest>,
    ) -> Result<Response<LogoutAllResponse>, Status> {
        let claims = require_claims(&request)?;
        invalidate_tokens(&self.state, claims.user_id).await?;
        Ok(Response::new(LogoutAllResponse {}))
    }
}

async fn invalidate_tokens(state: &AppState, user_id: Uuid) -> Result<(), FrontendError> {
    let mut user = state
        .config_store
        .get_user(user_id)
        .await
        .ok_or(FrontendError::Unauthenticated)?;
    user.token_invalidated_at = Utc::now();
    state.config_store.update_user(user).await
}
