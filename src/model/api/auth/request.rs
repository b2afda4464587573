use serde::{Deserialize, Serialize};

use crate::model::api::user::SafeUser;

/// Raw login credentials, received from a user. Never stored. For an
/// invited-but-unregistered voter the password is their invite token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Body of a self-service registration. Always creates a voter account.
#[derive(Debug, Serialize, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// What a successful login or registration returns: the safe view of the
/// account plus the bearer form of the cookie token.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: SafeUser,
    pub token: String,
}
