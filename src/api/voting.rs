use std::collections::BTreeMap;

use chrono::Utc;
use rocket::{serde::json::Json, Route};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::auth::{Admin, AnyUser, AuthToken, Voter},
    db::{
        auto_close_expired, count_by_candidate, votes_for_session, Candidate,
        ParticipationRequest, Session, User, Vote,
    },
    store::{Coll, Id},
};

use super::common::{session_by_id, user_by_token};

pub fn routes() -> Vec<Route> {
    routes![cast_vote, session_votes, session_results, create_request]
}

/// A vote the user wishes to cast.
#[derive(Debug, Serialize, Deserialize)]
struct VoteSpec {
    session_id: Id,
    position_id: Id,
    candidate_id: Id,
}

#[post("/votes", data = "<spec>", format = "json")]
async fn cast_vote(
    token: AuthToken<Voter>,
    spec: Json<VoteSpec>,
    users: Coll<User>,
    sessions: Coll<Session>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
) -> Result<Json<Vote>> {
    let voter = user_by_token(&token, &users)?;
    let spec = spec.0;

    // Let any overdue session close before judging eligibility.
    let now = Utc::now();
    auto_close_expired(&sessions, now)?;

    let session = session_by_id(spec.session_id, &sessions)?;
    if !session.is_active(now) {
        return Err(Error::Validation(format!(
            "Session {} is not open for voting",
            spec.session_id
        )));
    }
    if !session.positions.contains(&spec.position_id) {
        return Err(Error::not_found(format!(
            "Position {} in session {}",
            spec.position_id, spec.session_id
        )));
    }
    let candidate = candidates
        .get(spec.candidate_id)
        .ok_or_else(|| Error::not_found(format!("Candidate {}", spec.candidate_id)))?;
    if candidate.position_id != spec.position_id {
        return Err(Error::Validation(format!(
            "Candidate {} is not standing for position {}",
            spec.candidate_id, spec.position_id
        )));
    }

    // One vote per voter per position per session.
    let duplicate = votes.all().iter().any(|vote| {
        vote.session_id == spec.session_id
            && vote.position_id == spec.position_id
            && vote.voter_id == voter.id
    });
    if duplicate {
        return Err(Error::Conflict(
            "Already voted for this position".to_string(),
        ));
    }

    let vote = Vote::new(spec.session_id, spec.position_id, spec.candidate_id, voter.id);
    votes.insert(vote.clone())?;
    Ok(Json(vote))
}

#[get("/sessions/<session_id>/votes")]
async fn session_votes(
    _token: AuthToken<Admin>,
    session_id: Id,
    sessions: Coll<Session>,
    votes: Coll<Vote>,
) -> Result<Json<Vec<Vote>>> {
    session_by_id(session_id, &sessions)?;
    Ok(Json(votes_for_session(&votes, session_id)))
}

/// Aggregated results for one session. Ties are presented, never broken.
#[derive(Debug, Serialize, Deserialize)]
struct SessionResults {
    session_id: Id,
    total: u64,
    counts: BTreeMap<Id, u64>,
}

#[get("/sessions/<session_id>/results")]
async fn session_results(
    _token: AuthToken<AnyUser>,
    session_id: Id,
    sessions: Coll<Session>,
    votes: Coll<Vote>,
) -> Result<Json<SessionResults>> {
    session_by_id(session_id, &sessions)?;
    let raw = votes_for_session(&votes, session_id);
    Ok(Json(SessionResults {
        session_id,
        total: raw.len() as u64,
        counts: count_by_candidate(&raw),
    }))
}

#[post("/sessions/<session_id>/requests")]
async fn create_request(
    token: AuthToken<Voter>,
    session_id: Id,
    users: Coll<User>,
    sessions: Coll<Session>,
    requests: Coll<ParticipationRequest>,
) -> Result<Json<ParticipationRequest>> {
    let voter = user_by_token(&token, &users)?;
    session_by_id(session_id, &sessions)?;

    let pending = requests.all().iter().any(|request| {
        request.session_id == session_id && request.voter_id == voter.id && request.is_pending()
    });
    if pending {
        return Err(Error::Conflict(
            "A pending request already exists for this session".to_string(),
        ));
    }

    let request = ParticipationRequest::new(session_id, voter.id);
    requests.insert(request.clone())?;
    Ok(Json(request))
}
