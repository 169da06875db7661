//! Two-party conversations.
//!
//! - `lifecycle` -- Sent -> Delivered -> Read transitions and the enriched view
//! - `store` -- conversation documents on top of the read-modify-write loop
//! - `service` -- the send / read / query operations callers use

pub mod lifecycle;
pub mod service;
pub mod store;

pub use service::ConversationService;
pub use store::{ConversationStore, Modified, UpsertOutcome};
