use argon2::Config;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::common::Role;
use crate::model::store::Id;

/// Core account data, as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    /// Always stored lowercased, making email lookups case-insensitive by
    /// construction.
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub active: bool,
}

impl User {
    /// Create an account with a fresh id and a hashed password.
    pub fn new(email: &str, name: Option<String>, password: &str, role: Role) -> Self {
        Self {
            id: Id::new(),
            email: normalize_email(email),
            name,
            password_hash: hash_password(password),
            role,
            active: true,
        }
    }

    /// The account seeded on first launch.
    pub fn super_admin(email: &str, password: &str) -> Self {
        Self::new(email, None, password, Role::SuperAdmin)
    }

    /// Check whether the given password is correct. A hash that does not
    /// parse (e.g. a hand-edited store file) simply fails the check.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }
}

/// Canonical form of an email address: trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Hash a password (or invite token) for storage.
pub fn hash_password(password: &str) -> String {
    // 16 bytes is recommended for password hashing:
    //  https://en.wikipedia.org/wiki/Argon2
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill(&mut salt);
    argon2::hash_encoded(password.as_bytes(), &salt, &Config::default())
        .unwrap() // Safe because the default `Config` is valid.
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_verification() {
        let user = User::new("Someone@Example.COM ", None, "hunter2", Role::Voter);
        assert_eq!(user.email, "someone@example.com");
        assert!(user.verify_password("hunter2"));
        assert!(!user.verify_password("hunter3"));
    }

    #[test]
    fn unparseable_hash_fails_closed() {
        let mut user = User::new("a@example.com", None, "hunter2", Role::Voter);
        user.password_hash = "not-an-argon2-hash".to_string();
        assert!(!user.verify_password("hunter2"));
    }
}
