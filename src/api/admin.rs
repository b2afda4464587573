use rocket::{serde::json::Json, Route, State};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::{Admin, AuthToken},
        user::{SafeUser, UserSpec, UserUpdate},
    },
    db::{
        normalize_email, Invite, ParticipationRequest, RequestStatus, SessionVisibility, Settings,
        User,
    },
    store::{Coll, Id, Store},
};

use super::common::session_by_id;
use crate::model::db::Session;

pub fn routes() -> Vec<Route> {
    routes![
        get_users,
        get_user,
        create_user,
        update_user,
        delete_user,
        get_requests,
        approve_request,
        reject_request,
        create_invite,
        get_invites,
        update_settings,
    ]
}

#[get("/users")]
async fn get_users(_token: AuthToken<Admin>, users: Coll<User>) -> Result<Json<Vec<SafeUser>>> {
    Ok(Json(users.all().into_iter().map(SafeUser::from).collect()))
}

#[get("/users/<user_id>")]
async fn get_user(
    _token: AuthToken<Admin>,
    user_id: Id,
    users: Coll<User>,
) -> Result<Json<SafeUser>> {
    let user = users
        .get(user_id)
        .ok_or_else(|| Error::not_found(format!("User {user_id}")))?;
    Ok(Json(user.into()))
}

#[post("/users", data = "<spec>", format = "json")]
async fn create_user(
    _token: AuthToken<Admin>,
    spec: Json<UserSpec>,
    users: Coll<User>,
) -> Result<Json<SafeUser>> {
    let spec = spec.0;
    let email = normalize_email(&spec.email);
    if email.is_empty() || spec.password.is_empty() {
        return Err(Error::Validation("Email and password required".to_string()));
    }
    if users.all().iter().any(|user| user.email == email) {
        return Err(Error::Conflict(format!("Email already in use: {email}")));
    }

    let user = User::new(&email, spec.name, &spec.password, spec.role);
    users.insert(user.clone())?;
    Ok(Json(user.into()))
}

#[put("/users/<user_id>", data = "<update>", format = "json")]
async fn update_user(
    _token: AuthToken<Admin>,
    user_id: Id,
    update: Json<UserUpdate>,
    users: Coll<User>,
) -> Result<Json<SafeUser>> {
    let update = update.0;
    if let Some(ref email) = update.email {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(Error::Validation("Email cannot be empty".to_string()));
        }
        if users
            .all()
            .iter()
            .any(|user| user.email == email && user.id != user_id)
        {
            return Err(Error::Conflict(format!("Email already in use: {email}")));
        }
    }

    let modified = users.modify(user_id, |user| update.apply(user))?;
    if !modified {
        return Err(Error::not_found(format!("User {user_id}")));
    }
    Ok(Json(users.get(user_id).unwrap().into())) // Presence already checked.
}

#[delete("/users/<user_id>")]
async fn delete_user(_token: AuthToken<Admin>, user_id: Id, users: Coll<User>) -> Result<()> {
    let all = users.all();
    let target = all
        .iter()
        .find(|user| user.id == user_id)
        .ok_or_else(|| Error::not_found(format!("User {user_id}")))?;

    // Prevent deleting the last account that could still administrate.
    let admins = all
        .iter()
        .filter(|user| user.role.rights().is_admin() && user.active)
        .count();
    if target.role.rights().is_admin() && admins == 1 {
        return Err(Error::Validation("Cannot delete the last admin".to_string()));
    }

    users.remove(user_id)?;
    Ok(())
}

#[get("/requests")]
async fn get_requests(
    _token: AuthToken<Admin>,
    requests: Coll<ParticipationRequest>,
) -> Result<Json<Vec<ParticipationRequest>>> {
    Ok(Json(requests.all()))
}

#[post("/requests/<request_id>/approve")]
async fn approve_request(
    _token: AuthToken<Admin>,
    request_id: Id,
    requests: Coll<ParticipationRequest>,
) -> Result<Json<ParticipationRequest>> {
    decide_request(request_id, RequestStatus::Approved, &requests)
}

#[post("/requests/<request_id>/reject")]
async fn reject_request(
    _token: AuthToken<Admin>,
    request_id: Id,
    requests: Coll<ParticipationRequest>,
) -> Result<Json<ParticipationRequest>> {
    decide_request(request_id, RequestStatus::Rejected, &requests)
}

/// Apply a terminal decision to a pending request.
fn decide_request(
    request_id: Id,
    status: RequestStatus,
    requests: &Coll<ParticipationRequest>,
) -> Result<Json<ParticipationRequest>> {
    let request = requests
        .get(request_id)
        .ok_or_else(|| Error::not_found(format!("Request {request_id}")))?;
    if !request.is_pending() {
        return Err(Error::Validation(format!(
            "Request {request_id} is already {}",
            request.status
        )));
    }

    requests.modify(request_id, |request| request.status = status)?;
    Ok(Json(requests.get(request_id).unwrap())) // Presence already checked.
}

/// An invitation request.
#[derive(Debug, Serialize, Deserialize)]
struct InviteSpec {
    email: String,
}

/// The one-time view of a freshly issued invite: the only place the
/// cleartext token ever appears.
#[derive(Debug, Serialize, Deserialize)]
struct InviteReceipt {
    email: String,
    token: String,
}

/// An invite as listed afterwards: no token, only redemption state.
#[derive(Debug, Serialize, Deserialize)]
struct InviteView {
    id: Id,
    email: String,
    redeemed: bool,
}

impl From<Invite> for InviteView {
    fn from(invite: Invite) -> Self {
        Self {
            id: invite.id,
            email: invite.email,
            redeemed: invite.redeemed,
        }
    }
}

#[post("/sessions/<session_id>/invites", data = "<spec>", format = "json")]
async fn create_invite(
    _token: AuthToken<Admin>,
    session_id: Id,
    spec: Json<InviteSpec>,
    sessions: Coll<Session>,
    users: Coll<User>,
    invites: Coll<Invite>,
) -> Result<Json<InviteReceipt>> {
    session_by_id(session_id, &sessions)?;
    let email = normalize_email(&spec.email);
    if email.is_empty() {
        return Err(Error::Validation("Email required".to_string()));
    }
    if users.all().iter().any(|user| user.email == email) {
        return Err(Error::Conflict(format!("{email} is already registered")));
    }
    if invites
        .all()
        .iter()
        .any(|invite| invite.session_id == session_id && invite.email == email && !invite.redeemed)
    {
        return Err(Error::Conflict(format!("{email} is already invited")));
    }

    let (invite, token) = Invite::issue(session_id, &email);
    invites.insert(invite)?;
    Ok(Json(InviteReceipt { email, token }))
}

#[get("/sessions/<session_id>/invites")]
async fn get_invites(
    _token: AuthToken<Admin>,
    session_id: Id,
    sessions: Coll<Session>,
    invites: Coll<Invite>,
) -> Result<Json<Vec<InviteView>>> {
    session_by_id(session_id, &sessions)?;
    Ok(Json(
        invites
            .all()
            .into_iter()
            .filter(|invite| invite.session_id == session_id)
            .map(InviteView::from)
            .collect(),
    ))
}

/// The mutable settings fields.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsUpdate {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    logo: Option<String>,
    #[serde(default)]
    rules: Option<String>,
    #[serde(default)]
    session_visibility: Option<SessionVisibility>,
}

impl SettingsUpdate {
    fn apply(self, settings: &mut Settings) {
        if let Some(name) = self.name {
            settings.name = name;
        }
        if let Some(logo) = self.logo {
            settings.logo = logo;
        }
        if let Some(rules) = self.rules {
            settings.rules = rules;
        }
        if let Some(session_visibility) = self.session_visibility {
            settings.session_visibility = session_visibility;
        }
    }
}

#[put("/settings", data = "<update>", format = "json")]
async fn update_settings(
    _token: AuthToken<Admin>,
    update: Json<SettingsUpdate>,
    store: &State<Store>,
) -> Result<Json<Settings>> {
    let mut settings = store.settings();
    update.0.apply(&mut settings);
    store.put_settings(&settings)?;
    Ok(Json(settings))
}
