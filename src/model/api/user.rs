use serde::{Deserialize, Serialize};

use crate::model::common::Role;
use crate::model::db::{hash_password, normalize_email, User};
use crate::model::store::Id;

/// A user as shown over the API: everything except the credential hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeUser {
    pub id: Id,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role: Role,
    pub active: bool,
}

impl From<User> for SafeUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            active: user.active,
        }
    }
}

/// Admin-side account creation.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserSpec {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Voter
}

/// The mutable account fields. Unknown keys are rejected rather than
/// silently merged.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserUpdate {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl UserUpdate {
    /// Merge the set fields into the record. Email uniqueness is the
    /// caller's job.
    pub fn apply(self, user: &mut User) {
        if let Some(email) = self.email {
            user.email = normalize_email(&email);
        }
        if let Some(name) = self.name {
            user.name = Some(name);
        }
        if let Some(password) = self.password {
            user.password_hash = hash_password(&password);
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(active) = self.active {
            user.active = active;
        }
    }
}
