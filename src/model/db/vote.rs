use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::store::{Coll, Id};

/// A single cast vote. Append-only: votes are never edited, only removed
/// wholesale when their session is deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: Id,
    pub session_id: Id,
    pub position_id: Id,
    pub candidate_id: Id,
    pub voter_id: Id,
}

impl Vote {
    pub fn new(session_id: Id, position_id: Id, candidate_id: Id, voter_id: Id) -> Self {
        Self {
            id: Id::new(),
            session_id,
            position_id,
            candidate_id,
            voter_id,
        }
    }
}

/// The raw vote set for one session, in the order the votes were cast.
/// Aggregation is the caller's business.
pub fn votes_for_session(votes: &Coll<Vote>, session: Id) -> Vec<Vote> {
    votes
        .all()
        .into_iter()
        .filter(|vote| vote.session_id == session)
        .collect()
}

/// Vote counts per candidate within an already-filtered vote set. Ties are
/// reported as equal counts, never broken.
pub fn count_by_candidate(votes: &[Vote]) -> BTreeMap<Id, u64> {
    let mut counts = BTreeMap::new();
    for vote in votes {
        *counts.entry(vote.candidate_id).or_insert(0) += 1;
    }
    counts
}
