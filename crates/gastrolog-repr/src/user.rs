//! Users, roles, and the claims propagated through authenticated requests
//! (design §3, §4.3, §4.10).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::User => f.write_str("user"),
        }
    }
}

/// A registered user. `password_hash` is never the plaintext; comparisons
/// always go through a constant-time verifier (see `gastrolog-auth`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub token_invalidated_at: DateTime<Utc>,
}

impl User {
    /// 3-64 printable characters, matching the Register/ChangePassword
    /// validation rule in design §4.10.
    pub fn validate_username(username: &str) -> Result<(), String> {
        let len = username.chars().count();
        if !(3..=64).contains(&len) {
            return Err("username must be 3-64 characters".into());
        }
        if username.chars().any(char::is_whitespace) {
            return Err("username must not contain whitespace".into());
        }
        if username.chars().any(|c| c.is_control()) {
            return Err("username must be printable".into());
        }
        Ok(())
    }
}

/// Claims propagated through the request context once a bearer token has
/// been validated (design §4.3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
    pub issued_at: DateTime<Utc>,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_length_bounds() {
        assert!(User::validate_username("ab").is_err());
        assert!(User::validate_username("abc").is_ok());
        assert!(User::validate_username(&"a".repeat(64)).is_ok());
        assert!(User::validate_username(&"a".repeat(65)).is_err());
    }

    #[test]
    fn username_rejects_whitespace() {
        assert!(User::validate_username("has space").is_err());
        assert!(User::validate_username("tabs\tare\tbad").is_err());
    }
}
