use rocket::{serde::json::Json, Route};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::auth::{Admin, AnyUser, AuthToken},
    db::{ChatMessage, Session, User},
    store::{Coll, Id},
};

use super::common::{session_by_id, user_by_token};

pub fn routes() -> Vec<Route> {
    routes![get_chat, post_chat, purge_chat]
}

#[get("/sessions/<session_id>/chat")]
async fn get_chat(
    _token: AuthToken<AnyUser>,
    session_id: Id,
    sessions: Coll<Session>,
    chats: Coll<ChatMessage>,
) -> Result<Json<Vec<ChatMessage>>> {
    session_by_id(session_id, &sessions)?;
    Ok(Json(
        chats
            .all()
            .into_iter()
            .filter(|message| message.session_id == session_id)
            .collect(),
    ))
}

/// A message the user wishes to post.
#[derive(Debug, Serialize, Deserialize)]
struct ChatMessageSpec {
    body: String,
}

#[post("/sessions/<session_id>/chat", data = "<spec>", format = "json")]
async fn post_chat(
    token: AuthToken<AnyUser>,
    session_id: Id,
    spec: Json<ChatMessageSpec>,
    users: Coll<User>,
    sessions: Coll<Session>,
    chats: Coll<ChatMessage>,
) -> Result<Json<ChatMessage>> {
    let author = user_by_token(&token, &users)?;
    session_by_id(session_id, &sessions)?;
    let body = spec.0.body;
    if body.trim().is_empty() {
        return Err(Error::Validation("Message body required".to_string()));
    }

    let message = ChatMessage::new(session_id, author.id, body);
    chats.insert(message.clone())?;
    Ok(Json(message))
}

#[delete("/sessions/<session_id>/chat")]
async fn purge_chat(
    _token: AuthToken<Admin>,
    session_id: Id,
    sessions: Coll<Session>,
    chats: Coll<ChatMessage>,
) -> Result<()> {
    session_by_id(session_id, &sessions)?;
    chats.remove_where(|message| message.session_id == session_id)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::serde_json::json,
    };

    use crate::model::store::Store;
    use crate::testing::{admin_client_and_store, login, register_voter, ADMIN_EMAIL, ADMIN_PASSWORD};

    use super::*;

    fn seed_session(store: &Store, title: &str) -> Id {
        let session = Session {
            id: Id::new(),
            title: title.to_string(),
            start_time: None,
            end_time: None,
            seats: 1,
            positions: vec![Id::new()],
            closed: false,
        };
        let id = session.id;
        Coll::<Session>::from_store(store).insert(session).unwrap();
        id
    }

    async fn post(client: &Client, session_id: Id, body: &str) -> Status {
        let response = client
            .post(uri!(post_chat(session_id)))
            .header(ContentType::JSON)
            .body(json!({ "body": body }).to_string())
            .dispatch()
            .await;
        response.status()
    }

    async fn list(client: &Client, session_id: Id) -> Vec<ChatMessage> {
        let response = client.get(uri!(get_chat(session_id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap()
    }

    #[rocket::async_test]
    async fn messages_arrive_in_order() {
        let (client, store) = admin_client_and_store().await;
        let session = seed_session(&store, "AGM");

        register_voter(&client, "chatty@example.com", "pw123").await;
        assert_eq!(Status::Ok, post(&client, session, "first").await);
        assert_eq!(Status::Ok, post(&client, session, "second").await);
        assert_eq!(Status::Ok, post(&client, session, "third").await);

        let messages = list(&client, session).await;
        let bodies: Vec<&str> = messages.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second", "third"]);
        // All stamped with the author's account.
        let author = messages[0].author_id;
        assert!(messages.iter().all(|m| m.author_id == author));
    }

    #[rocket::async_test]
    async fn empty_messages_are_rejected() {
        let (client, store) = admin_client_and_store().await;
        let session = seed_session(&store, "AGM");
        register_voter(&client, "quiet@example.com", "pw123").await;
        assert_eq!(Status::BadRequest, post(&client, session, "   ").await);
    }

    #[rocket::async_test]
    async fn chat_requires_authentication_and_a_real_session() {
        let (client, store) = admin_client_and_store().await;
        let session = seed_session(&store, "AGM");

        assert_eq!(Status::NotFound, post(&client, Id::new(), "hello").await);

        client.post("/auth/logout").dispatch().await;
        assert_eq!(Status::Unauthorized, post(&client, session, "hello").await);
        let response = client.get(uri!(get_chat(session))).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
    }

    #[rocket::async_test]
    async fn purge_clears_exactly_one_session() {
        let (client, store) = admin_client_and_store().await;
        let doomed = seed_session(&store, "Doomed");
        let survivor = seed_session(&store, "Survivor");

        register_voter(&client, "writer@example.com", "pw123").await;
        post(&client, doomed, "gone soon").await;
        post(&client, survivor, "still here").await;

        // Voters cannot purge.
        let response = client.delete(uri!(purge_chat(doomed))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());

        login(&client, ADMIN_EMAIL, ADMIN_PASSWORD).await;
        let response = client.delete(uri!(purge_chat(doomed))).dispatch().await;
        assert_eq!(Status::Ok, response.status());

        assert!(list(&client, doomed).await.is_empty());
        let remaining = list(&client, survivor).await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].body, "still here");
    }
}
