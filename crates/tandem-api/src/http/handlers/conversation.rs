//! Two-party conversation HTTP handlers.
//!
//! Endpoints:
//! - POST /api/v1/conversations/messages         - Send a message
//! - GET  /api/v1/conversations/{key}/messages   - List messages for a requester
//! - POST /api/v1/conversations/{key}/read       - Mark messages read

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Serialize;

use tandem_types::conversation::ConversationKey;
use tandem_types::message::{EnrichedMessage, Message, ReadReceipt, SendMessageRequest};

use crate::http::error::AppError;
use crate::http::handlers::{MarkReadBody, MessageListQuery};
use crate::http::response::{ApiResponse, RequestClock};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SentMessage {
    pub conversation_key: ConversationKey,
    pub message: Message,
    /// False when the message id was already stored (idempotent retry).
    pub inserted: bool,
    pub cost: f64,
}

#[derive(Debug, Serialize)]
pub struct MessageList {
    pub messages: Vec<EnrichedMessage>,
    pub unread: usize,
}

fn parse_key(raw: &str) -> Result<ConversationKey, AppError> {
    ConversationKey::parse(raw).map_err(|e| AppError::Validation(e.to_string()))
}

/// POST /api/v1/conversations/messages - Send a message between two parties.
pub async fn send_message(
    State(state): State<AppState>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<ApiResponse<SentMessage>>, AppError> {
    let clock = RequestClock::start();

    let outcome = state.conversations.send(request).await?;
    let key = outcome.conversation.key.clone();

    let resp = clock
        .respond(SentMessage {
            conversation_key: key.clone(),
            message: outcome.message,
            inserted: outcome.inserted,
            cost: outcome.cost,
        })
        .with_link("messages", &format!("/api/v1/conversations/{key}/messages"));

    Ok(Json(resp))
}

/// GET /api/v1/conversations/{key}/messages - Messages enriched for `requester`.
pub async fn get_messages(
    State(state): State<AppState>,
    Path(raw_key): Path<String>,
    Query(query): Query<MessageListQuery>,
) -> Result<Json<ApiResponse<MessageList>>, AppError> {
    let clock = RequestClock::start();
    let key = parse_key(&raw_key)?;

    let messages = state
        .conversations
        .get_messages(&key, &query.requester, query.unread_only)
        .await?;
    let unread = messages.iter().filter(|m| m.needs_read_confirmation).count();

    let resp = clock
        .respond(MessageList { messages, unread })
        .with_link("self", &format!("/api/v1/conversations/{key}/messages"));

    Ok(Json(resp))
}

/// POST /api/v1/conversations/{key}/read - Mark messages read by `reader`.
pub async fn mark_read(
    State(state): State<AppState>,
    Path(raw_key): Path<String>,
    Json(body): Json<MarkReadBody>,
) -> Result<Json<ApiResponse<ReadReceipt>>, AppError> {
    let clock = RequestClock::start();
    let key = parse_key(&raw_key)?;

    let receipt = state
        .conversations
        .mark_read(&key, &body.message_ids, &body.reader)
        .await?;

    Ok(Json(clock.respond(receipt)))
}
