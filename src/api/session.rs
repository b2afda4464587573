use chrono::{DateTime, Utc};
use rocket::{serde::json::Json, Route, State};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::{Admin, AnyUser, AuthToken},
        session::{
            CandidateSpec, CandidateUpdate, PositionSpec, PositionUpdate, SessionSpec,
            SessionUpdate, SessionView,
        },
    },
    db::{
        auto_close_expired, Candidate, ChatMessage, Invite, ParticipationRequest, Position,
        Session, Vote,
    },
    store::{Coll, Id, Store},
};

use super::common::session_by_id;

pub fn routes() -> Vec<Route> {
    routes![
        get_sessions,
        get_session,
        create_session,
        update_session,
        close_session,
        delete_session,
        create_position,
        get_positions,
        update_position,
        delete_position,
        create_candidate,
        get_candidates,
        update_candidate,
        delete_candidate,
    ]
}

#[get("/sessions")]
async fn get_sessions(
    token: Option<AuthToken<AnyUser>>,
    sessions: Coll<Session>,
    store: &State<Store>,
) -> Result<Json<Vec<SessionView>>> {
    check_visibility(token.is_some(), store)?;
    let now = Utc::now();
    auto_close_expired(&sessions, now)?;
    Ok(Json(
        sessions
            .all()
            .into_iter()
            .map(|session| SessionView::new(session, now))
            .collect(),
    ))
}

#[get("/sessions/<session_id>")]
async fn get_session(
    token: Option<AuthToken<AnyUser>>,
    session_id: Id,
    sessions: Coll<Session>,
    store: &State<Store>,
) -> Result<Json<SessionView>> {
    check_visibility(token.is_some(), store)?;
    let now = Utc::now();
    auto_close_expired(&sessions, now)?;
    let session = session_by_id(session_id, &sessions)?;
    Ok(Json(SessionView::new(session, now)))
}

#[post("/sessions", data = "<spec>", format = "json")]
async fn create_session(
    _token: AuthToken<Admin>,
    spec: Json<SessionSpec>,
    sessions: Coll<Session>,
    positions: Coll<Position>,
) -> Result<Json<SessionView>> {
    let spec = spec.0;
    if spec.title.trim().is_empty() {
        return Err(Error::Validation("Title required".to_string()));
    }
    validate_window(spec.start_time, spec.end_time, spec.seats.unwrap_or(1))?;

    // Any pre-attached positions must exist.
    let known = positions.all();
    for id in &spec.positions {
        if !known.iter().any(|position| position.id == *id) {
            return Err(Error::not_found(format!("Position {id}")));
        }
    }

    let session: Session = spec.into();
    sessions.insert(session.clone())?;
    Ok(Json(SessionView::new(session, Utc::now())))
}

#[put("/sessions/<session_id>", data = "<update>", format = "json")]
async fn update_session(
    _token: AuthToken<Admin>,
    session_id: Id,
    update: Json<SessionUpdate>,
    sessions: Coll<Session>,
) -> Result<Json<SessionView>> {
    let session = session_by_id(session_id, &sessions)?;
    if session.closed {
        return Err(Error::Validation(format!(
            "Cannot modify closed session {session_id}"
        )));
    }

    let update = update.0;
    let start = update.start_time.or(session.start_time);
    let end = update.end_time.or(session.end_time);
    let seats = update.seats.unwrap_or(session.seats);
    validate_window(start, end, seats)?;

    sessions.modify(session_id, |session| update.apply(session))?;
    let session = sessions.get(session_id).unwrap(); // Presence already checked.
    Ok(Json(SessionView::new(session, Utc::now())))
}

#[post("/sessions/<session_id>/close")]
async fn close_session(
    _token: AuthToken<Admin>,
    session_id: Id,
    sessions: Coll<Session>,
) -> Result<()> {
    let session = session_by_id(session_id, &sessions)?;
    if session.closed {
        return Err(Error::Validation(format!(
            "Session {session_id} is already closed"
        )));
    }
    sessions.modify(session_id, |session| session.closed = true)?;
    Ok(())
}

#[delete("/sessions/<session_id>")]
#[allow(clippy::too_many_arguments)]
async fn delete_session(
    _token: AuthToken<Admin>,
    session_id: Id,
    sessions: Coll<Session>,
    positions: Coll<Position>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
    requests: Coll<ParticipationRequest>,
    invites: Coll<Invite>,
    chats: Coll<ChatMessage>,
) -> Result<()> {
    session_by_id(session_id, &sessions)?;

    // Delete the session itself, then everything hanging off it.
    sessions.remove(session_id)?;
    let owned: Vec<Id> = positions
        .all()
        .iter()
        .filter(|position| position.session_id == Some(session_id))
        .map(|position| position.id)
        .collect();
    positions.remove_where(|position| position.session_id == Some(session_id))?;
    candidates.remove_where(|candidate| owned.contains(&candidate.position_id))?;
    votes.remove_where(|vote| vote.session_id == session_id)?;
    requests.remove_where(|request| request.session_id == session_id)?;
    invites.remove_where(|invite| invite.session_id == session_id)?;
    chats.remove_where(|message| message.session_id == session_id)?;
    Ok(())
}

#[post("/positions", data = "<spec>", format = "json")]
async fn create_position(
    _token: AuthToken<Admin>,
    spec: Json<PositionSpec>,
    sessions: Coll<Session>,
    positions: Coll<Position>,
) -> Result<Json<Position>> {
    let spec = spec.0;
    if spec.title.trim().is_empty() {
        return Err(Error::Validation("Title required".to_string()));
    }
    if let Some(session_id) = spec.session_id {
        let session = session_by_id(session_id, &sessions)?;
        if session.closed {
            return Err(Error::Validation(format!(
                "Cannot modify closed session {session_id}"
            )));
        }
    }

    let position = Position::new(spec.title, spec.session_id);
    positions.insert(position.clone())?;
    if let Some(session_id) = spec.session_id {
        sessions.modify(session_id, |session| {
            session.attach_position(position.id)
        })?;
    }
    Ok(Json(position))
}

#[get("/positions?<session>")]
async fn get_positions(
    _token: AuthToken<AnyUser>,
    session: Option<Id>,
    positions: Coll<Position>,
) -> Result<Json<Vec<Position>>> {
    Ok(Json(
        positions
            .all()
            .into_iter()
            .filter(|position| session.map_or(true, |wanted| position.session_id == Some(wanted)))
            .collect(),
    ))
}

#[put("/positions/<position_id>", data = "<update>", format = "json")]
async fn update_position(
    _token: AuthToken<Admin>,
    position_id: Id,
    update: Json<PositionUpdate>,
    positions: Coll<Position>,
) -> Result<Json<Position>> {
    let modified = positions.modify(position_id, |position| {
        if let Some(title) = update.0.title {
            position.title = title;
        }
    })?;
    if !modified {
        return Err(Error::not_found(format!("Position {position_id}")));
    }
    Ok(Json(positions.get(position_id).unwrap())) // Presence already checked.
}

#[delete("/positions/<position_id>")]
async fn delete_position(
    _token: AuthToken<Admin>,
    position_id: Id,
    sessions: Coll<Session>,
    positions: Coll<Position>,
    candidates: Coll<Candidate>,
) -> Result<()> {
    if !positions.remove(position_id)? {
        return Err(Error::not_found(format!("Position {position_id}")));
    }

    // Detach from every session still referencing it, and drop its
    // candidates with it.
    let mut all = sessions.all();
    let mut changed = false;
    for session in all.iter_mut() {
        let before = session.positions.len();
        session.positions.retain(|id| *id != position_id);
        changed |= session.positions.len() != before;
    }
    if changed {
        sessions.save(all)?;
    }
    candidates.remove_where(|candidate| candidate.position_id == position_id)?;
    Ok(())
}

#[post("/candidates", data = "<spec>", format = "json")]
async fn create_candidate(
    _token: AuthToken<Admin>,
    spec: Json<CandidateSpec>,
    positions: Coll<Position>,
    candidates: Coll<Candidate>,
) -> Result<Json<Candidate>> {
    let spec = spec.0;
    if spec.name.trim().is_empty() {
        return Err(Error::Validation("Name required".to_string()));
    }
    positions
        .get(spec.position_id)
        .ok_or_else(|| Error::not_found(format!("Position {}", spec.position_id)))?;

    let candidate = Candidate::new(spec.position_id, spec.name);
    candidates.insert(candidate.clone())?;
    Ok(Json(candidate))
}

#[get("/candidates?<position>")]
async fn get_candidates(
    _token: AuthToken<AnyUser>,
    position: Option<Id>,
    candidates: Coll<Candidate>,
) -> Result<Json<Vec<Candidate>>> {
    Ok(Json(
        candidates
            .all()
            .into_iter()
            .filter(|candidate| position.map_or(true, |wanted| candidate.position_id == wanted))
            .collect(),
    ))
}

#[put("/candidates/<candidate_id>", data = "<update>", format = "json")]
async fn update_candidate(
    _token: AuthToken<Admin>,
    candidate_id: Id,
    update: Json<CandidateUpdate>,
    candidates: Coll<Candidate>,
) -> Result<Json<Candidate>> {
    let modified = candidates.modify(candidate_id, |candidate| {
        if let Some(name) = update.0.name {
            candidate.name = name;
        }
    })?;
    if !modified {
        return Err(Error::not_found(format!("Candidate {candidate_id}")));
    }
    Ok(Json(candidates.get(candidate_id).unwrap())) // Presence already checked.
}

#[delete("/candidates/<candidate_id>")]
async fn delete_candidate(
    _token: AuthToken<Admin>,
    candidate_id: Id,
    candidates: Coll<Candidate>,
) -> Result<()> {
    if !candidates.remove(candidate_id)? {
        return Err(Error::not_found(format!("Candidate {candidate_id}")));
    }
    Ok(())
}

/// Reject windows that end before they start, and seat counts no session
/// could ever satisfy meaningfully.
fn validate_window(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    seats: u32,
) -> Result<()> {
    if seats < 1 {
        return Err(Error::Validation(
            "At least one seat is required".to_string(),
        ));
    }
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(Error::Validation(
                "Session ends before it starts".to_string(),
            ));
        }
    }
    Ok(())
}

/// Private deployments hide session data from unauthenticated callers.
fn check_visibility(authenticated: bool, store: &Store) -> Result<()> {
    if store.settings().session_visibility.is_private() && !authenticated {
        return Err(Error::Unauthorized(
            "Sessions are private on this deployment".to_string(),
        ));
    }
    Ok(())
}
