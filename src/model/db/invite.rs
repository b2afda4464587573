use data_encoding::BASE32_NOPAD;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::store::Id;

use super::user::{hash_password, normalize_email};

/// One-time invitation for an email address to join a session as a voter.
///
/// The cleartext token exists only at issue time; the store keeps its hash.
/// Redeeming an invite provisions an account and burns the invite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invite {
    pub id: Id,
    pub session_id: Id,
    pub email: String,
    pub token_hash: String,
    pub redeemed: bool,
}

const TOKEN_BYTES: usize = 10;

impl Invite {
    /// Issue an invite, returning it together with the cleartext token to
    /// show the admin exactly once.
    pub fn issue(session_id: Id, email: &str) -> (Self, String) {
        let mut bytes = [0_u8; TOKEN_BYTES];
        rand::thread_rng().fill(&mut bytes);
        let token = BASE32_NOPAD.encode(&bytes);
        let invite = Self {
            id: Id::new(),
            session_id,
            email: normalize_email(email),
            token_hash: hash_password(&token),
            redeemed: false,
        };
        (invite, token)
    }

    /// Check a presented token against this invite.
    pub fn verify_token(&self, token: &str) -> bool {
        argon2::verify_encoded(&self.token_hash, token.as_bytes()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies_once_issued() {
        let (invite, token) = Invite::issue(Id::new(), "Voter@Example.com");
        assert_eq!(invite.email, "voter@example.com");
        assert!(!invite.redeemed);
        assert!(invite.verify_token(&token));
        assert!(!invite.verify_token("WRONGTOKEN"));
    }

    #[test]
    fn tokens_are_unique_per_invite() {
        let (_, first) = Invite::issue(Id::new(), "a@example.com");
        let (_, second) = Invite::issue(Id::new(), "a@example.com");
        assert_ne!(first, second);
    }
}
