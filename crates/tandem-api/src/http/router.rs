//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`, plus an unauthenticated `/health`.
//! Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Two-party conversations
        .route(
            "/conversations/messages",
            post(handlers::conversation::send_message),
        )
        .route(
            "/conversations/{key}/messages",
            get(handlers::conversation::get_messages),
        )
        .route(
            "/conversations/{key}/read",
            post(handlers::conversation::mark_read),
        )
        // Group sessions
        .route("/sessions", post(handlers::session::create_session))
        .route("/sessions/{id}", get(handlers::session::get_session))
        .route(
            "/sessions/{id}/messages",
            get(handlers::session::get_messages).post(handlers::session::post_message),
        )
        .route("/sessions/{id}/read", post(handlers::session::mark_read))
        .route(
            "/sessions/{id}/participants",
            post(handlers::session::add_participant),
        )
        .route(
            "/sessions/{id}/presence",
            post(handlers::session::set_presence),
        )
        // Intent routing
        .route("/route", post(handlers::route::route));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serde_json::{Value, json};
    use tandem_core::store::MemoryDocumentStore;
    use tandem_types::config::TandemConfig;

    use super::*;
    use crate::state::AppDocumentStore;

    async fn spawn() -> String {
        let state = AppState::build(
            AppDocumentStore::Memory(MemoryDocumentStore::new()),
            &TandemConfig::default(),
            PathBuf::new(),
        )
        .unwrap();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_health() {
        let base = spawn().await;
        let body: Value = reqwest::get(format!("{base}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_conversation_send_list_and_read() {
        let base = spawn().await;
        let client = reqwest::Client::new();

        let sent: Value = client
            .post(format!("{base}/api/v1/conversations/messages"))
            .json(&json!({"sender_id": "zoe", "recipient_id": "ana", "body": "hola", "message_id": "m1"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(sent["data"]["conversation_key"], "ana_zoe");
        assert_eq!(sent["data"]["message"]["is_delivered"], true);

        let listed: Value = client
            .get(format!(
                "{base}/api/v1/conversations/ana_zoe/messages?requester=ana&unread_only=true"
            ))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(listed["data"]["unread"], 1);
        assert_eq!(listed["data"]["messages"][0]["needs_read_confirmation"], true);

        let receipt: Value = client
            .post(format!("{base}/api/v1/conversations/ana_zoe/read"))
            .json(&json!({"reader": "ana", "message_ids": ["m1", "missing"]}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(receipt["data"]["marked"], json!(["m1"]));
        assert_eq!(receipt["data"]["not_found"], 1);
    }

    #[tokio::test]
    async fn test_invalid_send_is_bad_request() {
        let base = spawn().await;
        let resp = reqwest::Client::new()
            .post(format!("{base}/api/v1/conversations/messages"))
            .json(&json!({"sender_id": "ana", "recipient_id": "ana", "body": "eco"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["errors"][0]["code"], "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn test_session_lifecycle_and_missing_session() {
        let base = spawn().await;
        let client = reqwest::Client::new();

        let created = client
            .post(format!("{base}/api/v1/sessions"))
            .json(&json!({
                "id": "s1",
                "participants": [
                    {"id": "ana", "display_name": "Ana"},
                    {"id": "beto", "display_name": "Beto"}
                ]
            }))
            .send()
            .await
            .unwrap();
        assert!(created.status().is_success());

        let posted: Value = client
            .post(format!("{base}/api/v1/sessions/s1/messages"))
            .json(&json!({"sender_id": "ana", "body": "buenas", "context": "ctx-0"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(posted["data"]["message"]["body"], "buenas");
        assert_eq!(posted["data"]["updated_context"], "ctx-0");

        let joined: Value = client
            .post(format!("{base}/api/v1/sessions/s1/participants"))
            .json(&json!({"id": "carla", "display_name": "Carla"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(joined["data"]["participants"].as_array().unwrap().len(), 3);

        let missing = client
            .get(format!("{base}/api/v1/sessions/nope"))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status().as_u16(), 404);
    }

    #[tokio::test]
    async fn test_route_returns_next_state() {
        let base = spawn().await;
        let body: Value = reqwest::Client::new()
            .post(format!("{base}/api/v1/route"))
            .json(&json!({"twin_id": "twin-1", "message": "hola"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["data"]["status"], "unbound");
        assert_eq!(body["data"]["state"]["turn_number"], 1);
    }
}
