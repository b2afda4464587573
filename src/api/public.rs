use rocket::{serde::json::Json, Route, State};
use serde::{Deserialize, Serialize};

use crate::model::db::Settings;
use crate::model::store::Store;

pub fn routes() -> Vec<Route> {
    routes![health, get_settings]
}

/// Liveness probe body.
#[derive(Debug, Serialize, Deserialize)]
struct Health {
    success: bool,
    message: String,
}

#[get("/health")]
fn health() -> Json<Health> {
    Json(Health {
        success: true,
        message: "API is running".to_string(),
    })
}

#[get("/settings")]
fn get_settings(store: &State<Store>) -> Json<Settings> {
    Json(store.settings())
}

#[cfg(test)]
mod tests {
    use rocket::http::Status;

    use crate::testing::client_and_store;

    use super::*;

    #[rocket::async_test]
    async fn health_reports_success() {
        let (client, _store) = client_and_store().await;
        let response = client.get(uri!(health)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let body: Health = serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert!(body.success);
    }

    #[rocket::async_test]
    async fn settings_are_publicly_readable_with_seeded_defaults() {
        let (client, _store) = client_and_store().await;
        let response = client.get(uri!(get_settings)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let settings: Settings =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[rocket::async_test]
    async fn unknown_routes_fall_back_to_the_json_catcher() {
        let (client, _store) = client_and_store().await;
        let response = client.get("/definitely/not/a/route").dispatch().await;
        assert_eq!(Status::NotFound, response.status());
        let body = response.into_string().await.unwrap();
        assert!(body.contains("\"success\":false"));
    }
}
