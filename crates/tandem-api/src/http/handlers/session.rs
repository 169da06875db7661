//! Group session HTTP handlers.
//!
//! Endpoints:
//! - POST /api/v1/sessions                     - Create a session
//! - GET  /api/v1/sessions/{id}                - Get a session
//! - POST /api/v1/sessions/{id}/messages       - Post a message (may trigger an assistant turn)
//! - GET  /api/v1/sessions/{id}/messages       - List messages for a requester
//! - POST /api/v1/sessions/{id}/read           - Mark messages read
//! - POST /api/v1/sessions/{id}/participants   - Add a participant
//! - POST /api/v1/sessions/{id}/presence       - Update a participant's presence

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;

use tandem_types::error::CoreError;
use tandem_types::message::{EnrichedMessage, NewMessage, ReadReceipt};
use tandem_types::session::{Participant, Session, SessionSendOutcome};

use crate::http::error::AppError;
use crate::http::handlers::{MarkReadBody, MessageListQuery};
use crate::http::response::{ApiResponse, RequestClock};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSessionBody {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub participants: Vec<Participant>,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageBody {
    #[serde(flatten)]
    pub message: NewMessage,
    /// Opaque continuation state from the previous assistant turn.
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PresenceBody {
    pub participant_id: String,
    pub online: bool,
}

fn session_links(resp: ApiResponse<Session>) -> ApiResponse<Session> {
    let id = resp.data.as_ref().map(|s| s.id.clone()).unwrap_or_default();
    resp.with_link("self", &format!("/api/v1/sessions/{id}"))
        .with_link("messages", &format!("/api/v1/sessions/{id}/messages"))
}

/// POST /api/v1/sessions - Create a session (idempotent for the same members).
pub async fn create_session(
    State(state): State<AppState>,
    Json(body): Json<CreateSessionBody>,
) -> Result<Json<ApiResponse<Session>>, AppError> {
    let clock = RequestClock::start();

    let session = state
        .sessions
        .create_session(body.participants, body.name, body.id)
        .await?;

    Ok(Json(session_links(clock.respond(session))))
}

/// GET /api/v1/sessions/{id} - Get a session by id.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<Session>>, AppError> {
    let clock = RequestClock::start();

    let session = state
        .sessions
        .get_session(&session_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("session '{session_id}'")))?;

    Ok(Json(session_links(clock.respond(session))))
}

/// POST /api/v1/sessions/{id}/messages - Append a message.
pub async fn post_message(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(body): Json<PostMessageBody>,
) -> Result<Json<ApiResponse<SessionSendOutcome>>, AppError> {
    let clock = RequestClock::start();

    let outcome = state
        .sessions
        .send_message(&session_id, body.message, body.context)
        .await?;

    Ok(Json(clock.respond(outcome)))
}

/// GET /api/v1/sessions/{id}/messages - Messages enriched for `requester`.
pub async fn get_messages(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<MessageListQuery>,
) -> Result<Json<ApiResponse<Vec<EnrichedMessage>>>, AppError> {
    let clock = RequestClock::start();

    let messages = state
        .sessions
        .get_messages(&session_id, &query.requester, query.unread_only)
        .await?;

    let resp = clock
        .respond(messages)
        .with_link("session", &format!("/api/v1/sessions/{session_id}"));
    Ok(Json(resp))
}

/// POST /api/v1/sessions/{id}/read - Record read receipts for `reader`.
pub async fn mark_read(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(body): Json<MarkReadBody>,
) -> Result<Json<ApiResponse<ReadReceipt>>, AppError> {
    let clock = RequestClock::start();

    let receipt = state
        .sessions
        .mark_read(&session_id, &body.message_ids, &body.reader)
        .await?;

    Ok(Json(clock.respond(receipt)))
}

/// POST /api/v1/sessions/{id}/participants - Add a participant.
pub async fn add_participant(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(participant): Json<Participant>,
) -> Result<Json<ApiResponse<Session>>, AppError> {
    let clock = RequestClock::start();

    let session = state
        .sessions
        .add_participant(&session_id, participant)
        .await?;

    Ok(Json(session_links(clock.respond(session))))
}

/// POST /api/v1/sessions/{id}/presence - Mark a participant online or offline.
pub async fn set_presence(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(body): Json<PresenceBody>,
) -> Result<Json<ApiResponse<Session>>, AppError> {
    let clock = RequestClock::start();

    let session = state
        .sessions
        .set_presence(&session_id, &body.participant_id, body.online)
        .await?;

    Ok(Json(session_links(clock.respond(session))))
}
