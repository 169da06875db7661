//! Group session types.
//!
//! A [`Session`] generalizes a two-party conversation to a named, multi-party
//! container with an opaque continuation-state blob for multi-turn exchanges
//! with an assistant participant.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Document-store key prefix for sessions.
pub const SESSION_KEY_PREFIX: &str = "session:";

/// Minimum number of participants a session is founded with.
pub const MIN_SESSION_PARTICIPANTS: usize = 2;

/// Whether a participant is a person or an automated (AI) participant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantKind {
    #[default]
    Human,
    Assistant,
}

impl fmt::Display for ParticipantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParticipantKind::Human => write!(f, "human"),
            ParticipantKind::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for ParticipantKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(ParticipantKind::Human),
            "assistant" | "ai" | "bot" => Ok(ParticipantKind::Assistant),
            other => Err(format!("invalid participant kind: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub kind: ParticipantKind,
    #[serde(default)]
    pub online: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

impl Participant {
    pub fn human(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            kind: ParticipantKind::Human,
            online: false,
            last_seen: None,
        }
    }

    pub fn assistant(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            kind: ParticipantKind::Assistant,
            ..Self::human(id, display_name)
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.kind == ParticipantKind::Assistant
    }
}

/// A named multi-party message container.
///
/// `context` is an opaque blob owned by the completion collaborator; nothing
/// in the core parses, trims, or re-encodes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub participants: Vec<Participant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl Session {
    /// Key under which this session's document is stored.
    pub fn document_key(id: &str) -> String {
        format!("{SESSION_KEY_PREFIX}{id}")
    }

    pub fn participant(&self, id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn participant_mut(&mut self, id: &str) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.id == id)
    }

    pub fn has_participant(&self, id: &str) -> bool {
        self.participant(id).is_some()
    }

    pub fn assistants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| p.is_assistant())
    }

    pub fn find_message(&self, message_id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == message_id)
    }

    /// The assistant reply linked to `message_id`, if one was stored.
    ///
    /// Only messages sent by an assistant participant count, whatever their id.
    pub fn reply_to(&self, message_id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| {
            m.reply_to.as_deref() == Some(message_id)
                && self.participant(&m.sender_id).is_some_and(Participant::is_assistant)
        })
    }
}

/// Summary returned after a session send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSendOutcome {
    pub message: Message,
    /// The assistant's reply when a mention triggered an automated turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<Message>,
    /// Continuation state for the caller to hand back on the next call.
    pub updated_context: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            id: "s1".into(),
            name: Some("Familia".into()),
            participants: vec![
                Participant::human("alice", "Alice"),
                Participant::assistant("twin", "Twin"),
            ],
            context: None,
            messages: Vec::new(),
            created_at: Utc::now(),
            last_activity_at: Utc::now(),
        }
    }

    #[test]
    fn test_document_key() {
        assert_eq!(Session::document_key("s1"), "session:s1");
    }

    #[test]
    fn test_participant_lookup() {
        let s = session();
        assert!(s.has_participant("alice"));
        assert!(!s.has_participant("bob"));
        let assistants: Vec<_> = s.assistants().map(|p| p.id.as_str()).collect();
        assert_eq!(assistants, vec!["twin"]);
    }

    #[test]
    fn test_participant_kind_parse() {
        assert_eq!("AI".parse::<ParticipantKind>().unwrap(), ParticipantKind::Assistant);
        assert_eq!("human".parse::<ParticipantKind>().unwrap(), ParticipantKind::Human);
        assert!("robot".parse::<ParticipantKind>().is_err());
    }

    #[test]
    fn test_context_serde_untouched() {
        let mut s = session();
        s.context = Some("{\"v\":2,\"turns\":[\"  keep  spacing \"]}".into());
        let json = serde_json::to_string(&s).unwrap();
        let parsed: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.context, s.context);
    }

    #[test]
    fn test_reply_to_requires_assistant_sender() {
        use crate::message::NewMessage;

        let mut s = session();
        let mut forged =
            Message::from_draft(NewMessage::text("alice", None, "nota"), Utc::now()).unwrap();
        forged.reply_to = Some("m1".into());
        s.messages.push(forged);
        assert!(s.reply_to("m1").is_none());

        let mut reply =
            Message::from_draft(NewMessage::text("twin", None, "hola"), Utc::now()).unwrap();
        reply.reply_to = Some("m1".into());
        s.messages.push(reply);
        assert_eq!(s.reply_to("m1").map(|m| m.sender_id.as_str()), Some("twin"));
    }
}
