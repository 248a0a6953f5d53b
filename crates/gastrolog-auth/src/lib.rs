//! Authentication primitives for the GastroLog RPC frontend: bearer token
//! minting/verification, password hashing, and the token-invalidation check
//! (design §4.3, §4.10).

pub mod password;
pub mod token;
pub mod validator;

pub use password::{hash_password, verify_password};
pub use token::TokenService;
pub use validator::{TokenValidator, UserLookup};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("internal auth error: {0}")]
    Internal(String),
}

impl From<AuthError> for gastrolog_repr::FrontendError {
    fn from(err: AuthError) -> gastrolog_repr::FrontendError {
        match err {
            AuthError::Unauthenticated => gastrolog_repr::FrontendError::Unauthenticated,
            AuthError::Internal(msg) => gastrolog_repr::FrontendError::Internal(msg),
        }
    }
}
