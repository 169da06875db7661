//! HTTP request handlers for the REST API.

pub mod conversation;
pub mod route;
pub mod session;

use serde::Deserialize;

/// Query parameters shared by the message listing endpoints.
#[derive(Debug, Deserialize)]
pub struct MessageListQuery {
    /// Identity the flags (`is_mine`, `needs_read_confirmation`) are computed for.
    pub requester: String,
    #[serde(default)]
    pub unread_only: bool,
}

/// Body of the read-receipt endpoints.
#[derive(Debug, Deserialize)]
pub struct MarkReadBody {
    pub reader: String,
    pub message_ids: Vec<String>,
}
