use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// What kind of account this is. Stored on the user record and shown in the
/// API as a snake_case string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Manager,
    Voter,
}

impl Role {
    /// The privilege level this role grants.
    pub fn rights(self) -> Rights {
        match self {
            Self::SuperAdmin | Self::Manager => Rights::Admin,
            Self::Voter => Rights::Voter,
        }
    }
}

impl Display for Role {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::SuperAdmin => "super_admin",
                Self::Manager => "manager",
                Self::Voter => "voter",
            }
        )
    }
}

/// Different privilege levels, as carried inside auth tokens.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Rights {
    Voter = 0,
    Admin = 1,
}

impl Rights {
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl Display for Rights {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Voter => "voter",
                Self::Admin => "admin",
            }
        )
    }
}
