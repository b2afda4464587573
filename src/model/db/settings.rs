use serde::{Deserialize, Serialize};

/// Deployment-wide presentation and policy settings. A single record, not a
/// collection; seeded with defaults on first launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub name: String,
    pub logo: String,
    pub rules: String,
    pub session_visibility: SessionVisibility,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: "Voting System".to_string(),
            logo: String::new(),
            rules: "one_vote_per_position".to_string(),
            session_visibility: SessionVisibility::Public,
        }
    }
}

/// Whether session listings are visible without logging in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionVisibility {
    Public,
    Private,
}

impl SessionVisibility {
    pub fn is_private(self) -> bool {
        matches!(self, Self::Private)
    }
}
