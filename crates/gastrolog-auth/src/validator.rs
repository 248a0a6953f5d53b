//! The token-validator step of the auth interceptor algorithm (design §4.3
//! step 4): given claims whose signature already checked out, confirm the
//! user still exists and hasn't invalidated tokens issued before now.

use async_trait::async_trait;
use gastrolog_repr::{Claims, User};

use crate::AuthError;

/// A lookup of users by id, abstracted so `gastrolog-auth` doesn't need to
/// depend on the config-store crate. `gastrolog-frontend` implements this
/// over its `ConfigStore` handle.
#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn find_user(&self, user_id: uuid::Uuid) -> Option<User>;
}

/// Checks a verified token's claims against the current user record.
pub struct TokenValidator<L> {
    lookup: L,
}

impl<L: UserLookup> TokenValidator<L> {
    pub fn new(lookup: L) -> TokenValidator<L> {
        TokenValidator { lookup }
    }

    /// Rejects if the user is gone, or if `claims.issued_at <=
    /// user.token_invalidated_at` (design §3 invariant: a token issued before
    /// invalidation is unconditionally rejected, not just tokens issued
    /// strictly earlier -- equal timestamps reject too, since logout and the
    /// next mint can land in the same clock tick).
    pub async fn validate(&self, claims: Claims) -> Result<Claims, AuthError> {
        let user = self
            .lookup
            .find_user(claims.user_id)
            .await
            .ok_or(AuthError::Unauthenticated)?;
        if claims.issued_at <= user.token_invalidated_at {
            return Err(AuthError::Unauthenticated);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use gastrolog_repr::Role;
    use uuid::Uuid;

    struct FixedLookup(Option<User>);

    #[async_trait]
    impl UserLookup for FixedLookup {
        async fn find_user(&self, _user_id: Uuid) -> Option<User> {
            self.0.clone()
        }
    }

    fn user(invalidated_at: chrono::DateTime<Utc>) -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            password_hash: "x".into(),
            role: Role::User,
            token_invalidated_at: invalidated_at,
        }
    }

    #[tokio::test]
    async fn missing_user_is_rejected() {
        let validator = TokenValidator::new(FixedLookup(None));
        let claims = Claims {
            user_id: Uuid::new_v4(),
            username: "alice".into(),
            role: Role::User,
            issued_at: Utc::now(),
        };
        assert!(matches!(
            validator.validate(claims).await,
            Err(AuthError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn token_issued_before_invalidation_is_rejected() {
        let now = Utc::now();
        let u = user(now);
        let validator = TokenValidator::new(FixedLookup(Some(u.clone())));
        let claims = Claims {
            user_id: u.id,
            username: u.username.clone(),
            role: u.role,
            issued_at: now - Duration::seconds(1),
        };
        assert!(matches!(
            validator.validate(claims).await,
            Err(AuthError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn token_issued_after_invalidation_is_accepted() {
        let now = Utc::now();
        let u = user(now - Duration::seconds(1));
        let validator = TokenValidator::new(FixedLookup(Some(u.clone())));
        let claims = Claims {
            user_id: u.id,
            username: u.username.clone(),
            role: u.role,
            issued_at: now,
        };
        assert!(validator.validate(claims).await.is_ok());
    }
}
