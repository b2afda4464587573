use serde::{Deserialize, Serialize};

use crate::model::store::Id;

/// A contestable role within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: Id,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Id>,
    pub title: String,
}

impl Position {
    pub fn new(title: String, session_id: Option<Id>) -> Self {
        Self {
            id: Id::new(),
            session_id,
            title,
        }
    }
}
