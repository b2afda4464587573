use crate::error::{Error, Result};
use crate::model::api::auth::AuthToken;
use crate::model::db::{Session, User};
use crate::model::store::{Coll, Id};

/// Return the live account behind a token, rejecting tokens whose account
/// has been removed or deactivated since the token was issued.
pub fn user_by_token<U>(token: &AuthToken<U>, users: &Coll<User>) -> Result<User> {
    users
        .get(token.id())
        .filter(|user| user.active)
        .ok_or_else(|| Error::Unauthorized("No active account behind this token".to_string()))
}

/// Look up a session or produce the canonical not-found error.
pub fn session_by_id(session_id: Id, sessions: &Coll<Session>) -> Result<Session> {
    sessions
        .get(session_id)
        .ok_or_else(|| Error::not_found(format!("Session {session_id}")))
}
