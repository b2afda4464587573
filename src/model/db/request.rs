use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::model::store::Id;

/// A voter's application to take part in a session. Created pending and
/// decided by an admin at most once; decisions are terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipationRequest {
    pub id: Id,
    pub session_id: Id,
    pub voter_id: Id,
    pub status: RequestStatus,
}

impl ParticipationRequest {
    pub fn new(session_id: Id, voter_id: Id) -> Self {
        Self {
            id: Id::new(),
            session_id,
            voter_id,
            status: RequestStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl Display for RequestStatus {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Pending => "pending",
                Self::Approved => "approved",
                Self::Rejected => "rejected",
            }
        )
    }
}
