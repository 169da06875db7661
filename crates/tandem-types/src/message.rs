//! Message types shared by two-party conversations and group sessions.
//!
//! A [`Message`] is immutable once created except for its lifecycle fields
//! (`is_delivered`, `delivered_at`, `is_read`, `read_at`, `read_by`), which
//! only the lifecycle engine in `tandem-core` mutates.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversation::{OriginMode, PartyRole};
use crate::error::CoreError;

/// Reference to a voice recording attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceAttachment {
    /// Where the audio lives (blob URI, object key, ...).
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Transcript produced by the speech collaborator, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
}

/// Lifecycle position of a message: `Sent -> Delivered -> Read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Read,
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageStatus::Sent => write!(f, "sent"),
            MessageStatus::Delivered => write!(f, "delivered"),
            MessageStatus::Read => write!(f, "read"),
        }
    }
}

/// A single message in a conversation or session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique within the owning conversation/session; the unit of idempotency.
    pub id: String,
    pub sender_id: String,
    /// `None` means broadcast to every session participant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<String>,
    #[serde(default)]
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<VoiceAttachment>,
    #[serde(default)]
    pub is_delivered: bool,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
    /// Per-reader receipts for broadcast messages.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub read_by: BTreeMap<String, DateTime<Utc>>,
    /// Set on an assistant reply: the id of the session message it answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

impl Message {
    /// Materialize a submitted draft into a `Sent` message.
    ///
    /// Generates a UUIDv7 identifier when the caller did not supply one.
    pub fn from_draft(draft: NewMessage, now: DateTime<Utc>) -> Result<Self, CoreError> {
        let id = match draft.id {
            Some(id) => {
                let id = id.trim().to_string();
                if id.is_empty() {
                    return Err(CoreError::invalid("message id is empty"));
                }
                id
            }
            None => Uuid::now_v7().to_string(),
        };

        let sender_id = draft.sender_id.trim().to_string();
        if sender_id.is_empty() {
            return Err(CoreError::invalid("sender id is empty"));
        }

        let recipient_id = match draft.recipient_id {
            Some(r) => {
                let r = r.trim().to_string();
                if r.is_empty() {
                    return Err(CoreError::invalid("recipient id is empty"));
                }
                Some(r)
            }
            None => None,
        };

        if draft.body.trim().is_empty() && draft.voice.is_none() {
            return Err(CoreError::invalid(
                "message body is empty and no voice attachment is present",
            ));
        }

        Ok(Self {
            id,
            sender_id,
            recipient_id,
            body: draft.body,
            created_at: now,
            voice: draft.voice,
            is_delivered: false,
            delivered_at: None,
            is_read: false,
            read_at: None,
            read_by: BTreeMap::new(),
            reply_to: None,
        })
    }

    pub fn status(&self) -> MessageStatus {
        if self.is_read {
            MessageStatus::Read
        } else if self.is_delivered {
            MessageStatus::Delivered
        } else {
            MessageStatus::Sent
        }
    }

    /// Recipient is `requester`, or the message is unaddressed (broadcast).
    pub fn is_for(&self, requester: &str) -> bool {
        match &self.recipient_id {
            Some(r) => r == requester,
            None => true,
        }
    }

    /// Whether `reader` is someone who is expected to confirm reading it.
    pub fn is_addressed_to(&self, reader: &str) -> bool {
        self.sender_id != reader && self.is_for(reader)
    }

    /// Whether `reader` has already confirmed reading this message.
    pub fn is_read_by(&self, reader: &str) -> bool {
        match &self.recipient_id {
            Some(r) if r == reader => self.is_read,
            Some(_) => false,
            None => self.read_by.contains_key(reader),
        }
    }
}

/// Inbound draft of a message, before an id and timestamp are assigned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    #[serde(default)]
    pub id: Option<String>,
    pub sender_id: String,
    #[serde(default)]
    pub recipient_id: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub voice: Option<VoiceAttachment>,
}

impl NewMessage {
    pub fn text(
        sender_id: impl Into<String>,
        recipient_id: Option<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            sender_id: sender_id.into(),
            recipient_id,
            body: body.into(),
            voice: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_voice(mut self, voice: VoiceAttachment) -> Self {
        self.voice = Some(voice);
        self
    }
}

/// Inbound submission for a two-party conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub sender_id: String,
    pub recipient_id: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub voice: Option<VoiceAttachment>,
    /// Caller-supplied id; makes retries idempotent.
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub origin: OriginMode,
    /// Role of the sender when `origin` is directed.
    #[serde(default = "default_sender_role")]
    pub sender_role: PartyRole,
    #[serde(default)]
    pub owner_id: Option<String>,
}

fn default_sender_role() -> PartyRole {
    PartyRole::Initiator
}

impl SendMessageRequest {
    pub fn new(
        sender_id: impl Into<String>,
        recipient_id: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            recipient_id: recipient_id.into(),
            body: body.into(),
            voice: None,
            message_id: None,
            origin: OriginMode::Canonical,
            sender_role: PartyRole::Initiator,
            owner_id: None,
        }
    }

    pub fn with_message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }
}

/// A message plus flags computed relative to the requesting identity.
///
/// Computed on every query, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedMessage {
    #[serde(flatten)]
    pub message: Message,
    pub status: MessageStatus,
    pub is_mine: bool,
    pub is_for_me: bool,
    pub needs_read_confirmation: bool,
}

/// Tally returned by a batch read confirmation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadReceipt {
    /// Ids that transitioned to read in this call.
    pub marked: Vec<String>,
    pub already_read: u32,
    pub not_found: u32,
    /// Ids found but not addressed to the reader (e.g. the reader's own messages).
    pub not_addressed: u32,
}

impl ReadReceipt {
    pub fn changed(&self) -> bool {
        !self.marked.is_empty()
    }
}
