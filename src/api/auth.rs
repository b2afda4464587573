use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::{AnyUser, AuthResponse, AuthToken, Credentials, Registration, AUTH_TOKEN_COOKIE},
        user::SafeUser,
    },
    common::Role,
    db::{normalize_email, Invite, User},
    store::Coll,
};

use super::common::user_by_token;

pub fn routes() -> Vec<Route> {
    routes![register, login, logout, me]
}

#[post("/auth/register", data = "<registration>", format = "json")]
async fn register(
    cookies: &CookieJar<'_>,
    registration: Json<Registration>,
    users: Coll<User>,
    config: &State<Config>,
) -> Result<Json<AuthResponse>> {
    let registration = registration.0;
    let email = normalize_email(&registration.email);
    if email.is_empty() || registration.password.is_empty() {
        return Err(Error::Validation("Email and password required".to_string()));
    }

    if users.all().iter().any(|user| user.email == email) {
        return Err(Error::Conflict(format!("Email already in use: {email}")));
    }

    let user = User::new(&email, registration.name, &registration.password, Role::Voter);
    users.insert(user.clone())?;

    Ok(Json(log_in(user, cookies, config)))
}

#[post("/auth/login", data = "<credentials>", format = "json")]
async fn login(
    cookies: &CookieJar<'_>,
    credentials: Json<Credentials>,
    users: Coll<User>,
    invites: Coll<Invite>,
    config: &State<Config>,
) -> Result<Json<AuthResponse>> {
    let email = normalize_email(&credentials.email);
    let password = &credentials.password;
    if email.is_empty() || password.is_empty() {
        return Err(Error::Validation("Email and password required".to_string()));
    }

    if let Some(user) = users.all().into_iter().find(|user| user.email == email) {
        if !user.verify_password(password) {
            return Err(Error::Unauthorized("Invalid credentials".to_string()));
        }
        if !user.active {
            return Err(Error::Unauthorized("Account is deactivated".to_string()));
        }
        return Ok(Json(log_in(user, cookies, config)));
    }

    // Unknown email: the password may be an invite token.
    let user = redeem_invite(&email, password, &users, &invites)?;
    Ok(Json(log_in(user, cookies, config)))
}

#[post("/auth/logout")]
fn logout(cookies: &CookieJar) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}

#[get("/auth/me")]
async fn me(token: AuthToken<AnyUser>, users: Coll<User>) -> Result<Json<SafeUser>> {
    let user = user_by_token(&token, &users)?;
    Ok(Json(user.into()))
}

/// Issue the auth cookie and assemble the login/registration response.
fn log_in(user: User, cookies: &CookieJar<'_>, config: &Config) -> AuthResponse {
    let token = AuthToken::issue(&user);
    let raw = token.encode(config);
    cookies.add(token.into_cookie(config));
    AuthResponse {
        user: user.into(),
        token: raw,
    }
}

/// Provision a voter account for an invited-but-unregistered email
/// presenting its invite token, and burn the invite. Losing a provisioning
/// race falls back to one fresh lookup against the winner.
fn redeem_invite(
    email: &str,
    token: &str,
    users: &Coll<User>,
    invites: &Coll<Invite>,
) -> Result<User> {
    let invite = invites
        .all()
        .into_iter()
        .filter(|invite| !invite.redeemed && invite.email == email)
        .find(|invite| invite.verify_token(token))
        .ok_or_else(|| Error::NotInvited(format!("No invite matches {email}")))?;

    let mut all = users.all();
    let user = if let Some(existing) = all.iter().find(|user| user.email == email) {
        if !(existing.verify_password(token) && existing.active) {
            return Err(Error::Unauthorized("Invalid credentials".to_string()));
        }
        existing.clone()
    } else {
        // The invite token becomes the account password, so the same
        // credentials keep working after the invite is burnt.
        let provisioned = User::new(email, None, token, Role::Voter);
        all.push(provisioned.clone());
        users.save(all)?;
        provisioned
    };

    invites.modify(invite.id, |invite| invite.redeemed = true)?;
    Ok(user)
}

#[cfg(test)]
mod tests {
    use rocket::{http::ContentType, serde::json::serde_json::json};

    use crate::model::db::Session;
    use crate::model::store::{Id, Store};
    use crate::testing::{client_and_store, login as do_login, register_voter, ADMIN_EMAIL};

    use super::*;

    #[rocket::async_test]
    async fn register_and_me() {
        let (client, _store) = client_and_store().await;

        let response = client
            .post(uri!(register))
            .header(ContentType::JSON)
            .body(json!({ "email": "Alice@Example.com", "password": "pw123", "name": "Alice" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());

        let body: AuthResponse =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(body.user.email, "alice@example.com");
        assert_eq!(body.user.role, Role::Voter);
        assert!(!body.token.is_empty());

        let response = client.get(uri!(me)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let user: SafeUser = serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.name.as_deref(), Some("Alice"));
    }

    #[rocket::async_test]
    async fn register_rejects_duplicates_case_insensitively() {
        let (client, _store) = client_and_store().await;
        register_voter(&client, "alice@example.com", "pw123").await;

        let response = client
            .post(uri!(register))
            .header(ContentType::JSON)
            .body(json!({ "email": "ALICE@example.com", "password": "other" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Conflict, response.status());
        assert!(response
            .into_string()
            .await
            .unwrap()
            .contains("\"success\":false"));
    }

    #[rocket::async_test]
    async fn register_requires_email_and_password() {
        let (client, _store) = client_and_store().await;
        for body in [
            json!({ "email": "", "password": "pw" }),
            json!({ "email": "a@example.com", "password": "" }),
            json!({ "email": "   ", "password": "pw" }),
        ] {
            let response = client
                .post(uri!(register))
                .header(ContentType::JSON)
                .body(body.to_string())
                .dispatch()
                .await;
            assert_eq!(Status::BadRequest, response.status());
        }
    }

    #[rocket::async_test]
    async fn login_checks_credentials() {
        let (client, _store) = client_and_store().await;
        register_voter(&client, "bob@example.com", "right-password").await;
        client.post(uri!(logout)).dispatch().await;

        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(json!({ "email": "bob@example.com", "password": "wrong" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
        assert_eq!(None, client.cookies().get(AUTH_TOKEN_COOKIE));

        do_login(&client, "Bob@Example.com", "right-password").await;
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());
    }

    #[rocket::async_test]
    async fn deactivated_accounts_cannot_log_in() {
        let (client, store) = client_and_store().await;
        register_voter(&client, "gone@example.com", "pw123").await;
        deactivate(&store, "gone@example.com");

        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(json!({ "email": "gone@example.com", "password": "pw123" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
    }

    #[rocket::async_test]
    async fn me_reflects_deactivation() {
        let (client, store) = client_and_store().await;
        register_voter(&client, "fading@example.com", "pw123").await;

        let response = client.get(uri!(me)).dispatch().await;
        assert_eq!(Status::Ok, response.status());

        deactivate(&store, "fading@example.com");
        let response = client.get(uri!(me)).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
    }

    #[rocket::async_test]
    async fn me_requires_authentication() {
        let (client, _store) = client_and_store().await;
        let response = client.get(uri!(me)).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
        assert!(response
            .into_string()
            .await
            .unwrap()
            .contains("\"success\":false"));
    }

    #[rocket::async_test]
    async fn invite_bootstrap_provisions_exactly_one_account() {
        let (client, store) = client_and_store().await;
        let token = seed_invite(&store, "invited@example.com");

        // First login provisions a voter account.
        do_login(&client, "invited@example.com", &token).await;
        let voters = voters_with_email(&store, "invited@example.com");
        assert_eq!(voters, 1);

        // The invite is burnt.
        let invites = Coll::<Invite>::from_store(&store);
        assert!(invites.all().iter().all(|invite| invite.redeemed));

        // A second identical login works without creating a duplicate.
        client.post(uri!(logout)).dispatch().await;
        do_login(&client, "invited@example.com", &token).await;
        assert_eq!(voters_with_email(&store, "invited@example.com"), 1);
    }

    #[rocket::async_test]
    async fn invite_bootstrap_rejects_wrong_tokens() {
        let (client, store) = client_and_store().await;
        seed_invite(&store, "invited@example.com");

        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(json!({ "email": "invited@example.com", "password": "WRONGTOKEN" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
        assert!(response
            .into_string()
            .await
            .unwrap()
            .contains("Not invited"));
        assert_eq!(voters_with_email(&store, "invited@example.com"), 0);
    }

    #[rocket::async_test]
    async fn uninvited_emails_are_not_invited() {
        let (client, store) = client_and_store().await;
        let token = seed_invite(&store, "alice@example.com");

        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(json!({ "email": "bob@example.com", "password": token }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
        assert!(response
            .into_string()
            .await
            .unwrap()
            .contains("Not invited"));
    }

    #[rocket::async_test]
    async fn bearer_header_works_without_the_cookie() {
        let (client, _store) = client_and_store().await;
        let response = client
            .post(uri!(register))
            .header(ContentType::JSON)
            .body(json!({ "email": "header@example.com", "password": "pw123" }).to_string())
            .dispatch()
            .await;
        let body: AuthResponse =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();

        // Drop the cookie; authenticate via the header alone.
        client.post(uri!(logout)).dispatch().await;
        let response = client
            .get(uri!(me))
            .header(rocket::http::Header::new(
                "Authorization",
                format!("Bearer {}", body.token),
            ))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
    }

    #[rocket::async_test]
    async fn seeded_admin_can_log_in() {
        let (client, _store) = client_and_store().await;
        do_login(&client, ADMIN_EMAIL, crate::testing::ADMIN_PASSWORD).await;
        let response = client.get(uri!(me)).dispatch().await;
        let user: SafeUser = serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(user.role, Role::SuperAdmin);
    }

    fn deactivate(store: &Store, email: &str) {
        let users = Coll::<User>::from_store(store);
        let id = users
            .all()
            .into_iter()
            .find(|user| user.email == email)
            .unwrap()
            .id;
        users.modify(id, |user| user.active = false).unwrap();
    }

    fn seed_invite(store: &Store, email: &str) -> String {
        let sessions = Coll::<Session>::from_store(store);
        let session = Session {
            id: Id::new(),
            title: "AGM".to_string(),
            start_time: None,
            end_time: None,
            seats: 1,
            positions: vec![Id::new()],
            closed: false,
        };
        let session_id = session.id;
        sessions.insert(session).unwrap();

        let (invite, token) = Invite::issue(session_id, email);
        Coll::<Invite>::from_store(store).insert(invite).unwrap();
        token
    }

    fn voters_with_email(store: &Store, email: &str) -> usize {
        Coll::<User>::from_store(store)
            .all()
            .iter()
            .filter(|user| user.email == email && user.role == Role::Voter)
            .count()
    }
}
