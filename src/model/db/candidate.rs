use serde::{Deserialize, Serialize};

use crate::model::store::Id;

/// Someone standing for a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: Id,
    pub position_id: Id,
    pub name: String,
}

impl Candidate {
    pub fn new(position_id: Id, name: String) -> Self {
        Self {
            id: Id::new(),
            position_id,
            name,
        }
    }
}
