//! Bearer token minting and verification (design §4.3, §4.10).

use chrono::{DateTime, Duration, Utc};
use gastrolog_repr::{Claims, Role};
use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AuthError;

/// The JWT claim set. `iat` doubles as the timestamp compared against a
/// user's `token_invalidated_at` (design §3 invariant): a token issued before
/// that watermark is unconditionally rejected, even if its signature and
/// expiry both check out.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenClaims {
    sub: Uuid,
    username: String,
    role: Role,
    iat: i64,
    exp: i64,
}

/// Mints and verifies bearer tokens with a single HMAC secret.
///
/// Holds the secret once as both an `EncodingKey` and `DecodingKey` so minting
/// and verification never accidentally use different keys.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> TokenService {
        TokenService {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    /// Mints a token for `user_id`/`username`/`role`, issued at `now`.
    pub fn mint(
        &self,
        user_id: Uuid,
        username: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = TokenClaims {
            sub: user_id,
            username: username.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    /// Verifies signature and expiry only; does NOT check
    /// `token_invalidated_at` — that requires a user lookup and is performed
    /// by the [`crate::validator::TokenValidator`] step that follows.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        let TokenData { claims, .. } = decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|_| AuthError::Unauthenticated)?;
        let issued_at = DateTime::from_timestamp(claims.iat, 0).ok_or(AuthError::Unauthenticated)?;
        Ok(Claims {
            user_id: claims.sub,
            username: claims.username,
            role: claims.role,
            issued_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn svc() -> TokenService {
        TokenService::new(b"test-secret", Duration::hours(1))
    }

    #[test]
    fn mint_then_verify_round_trips_claims() {
        let svc = svc();
        let now = Utc::now();
        let user_id = Uuid::new_v4();
        let token = svc.mint(user_id, "alice", Role::User, now).unwrap();
        let claims = svc.verify(&token).unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.issued_at.timestamp(), now.timestamp());
    }

    #[test]
    fn expired_token_is_rejected() {
        let svc = TokenService::new(b"test-secret", Duration::seconds(-1));
        let token = svc
            .mint(Uuid::new_v4(), "alice", Role::User, Utc::now())
            .unwrap();
        assert!(matches!(svc.verify(&token), Err(AuthError::Unauthenticated)));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let svc = svc();
        let token = svc
            .mint(Uuid::new_v4(), "alice", Role::User, Utc::now())
            .unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(matches!(
            svc.verify(&tampered),
            Err(AuthError::Unauthenticated)
        ));
    }
}
