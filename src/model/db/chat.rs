use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::store::Id;

/// One session-scoped chat message. Unlike the other collections, insertion
/// order is meaningful here and must be preserved by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Id,
    pub session_id: Id,
    pub author_id: Id,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(session_id: Id, author_id: Id, body: String) -> Self {
        Self {
            id: Id::new(),
            session_id,
            author_id,
            body,
            timestamp: Utc::now(),
        }
    }
}
