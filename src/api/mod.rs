use rocket::{http::Status, serde::json::Json, Catcher, Request, Route};
use serde::Serialize;

mod admin;
mod auth;
mod chat;
mod common;
mod public;
mod session;
mod voting;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(admin::routes());
    routes.extend(session::routes());
    routes.extend(voting::routes());
    routes.extend(chat::routes());
    routes.extend(public::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![fallback]
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

/// Uniform JSON error body for requests that never reached a route or were
/// rejected by a guard.
#[catch(default)]
fn fallback(status: Status, _req: &Request<'_>) -> (Status, Json<ErrorBody>) {
    let body = ErrorBody {
        success: false,
        message: status.reason().unwrap_or("Unknown error").to_string(),
    };
    (status, Json(body))
}
