//! Two-party conversation types.
//!
//! A [`Conversation`] is the document stored under a [`ConversationKey`]. The
//! key is derived from the two participant identifiers by the pairing
//! resolver in `tandem-core`; this module only owns its representation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::message::Message;

/// Separator between the two participant identifiers in a key.
///
/// Participant identifiers may never contain it, which is what keeps the
/// pair-to-key mapping collision free.
pub const KEY_SEPARATOR: char = '_';

/// Document-store key prefix for conversations.
pub const CONVERSATION_KEY_PREFIX: &str = "conversation:";

/// Stable identifier of a two-party conversation (`id1_id2`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConversationKey(String);

impl ConversationKey {
    /// Join two already-normalized identifiers in the given order.
    pub fn from_parts(first: &str, second: &str) -> Result<Self, CoreError> {
        validate_part(first)?;
        validate_part(second)?;
        Ok(Self(format!("{first}{KEY_SEPARATOR}{second}")))
    }

    /// Parse a raw key string (e.g. from a URL path) back into a key.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let (first, second) = raw.split_once(KEY_SEPARATOR).ok_or_else(|| {
            CoreError::invalid(format!("conversation key '{raw}' has no separator"))
        })?;
        Self::from_parts(first, second)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key under which this conversation's document is stored.
    pub fn document_key(&self) -> String {
        format!("{CONVERSATION_KEY_PREFIX}{}", self.0)
    }

    /// The two participant identifiers in key order.
    pub fn participants(&self) -> (&str, &str) {
        // Construction guarantees exactly one separator.
        self.0
            .split_once(KEY_SEPARATOR)
            .unwrap_or((self.0.as_str(), ""))
    }
}

fn validate_part(part: &str) -> Result<(), CoreError> {
    if part.is_empty() {
        return Err(CoreError::invalid("participant identifier is empty"));
    }
    if part.contains(KEY_SEPARATOR) {
        return Err(CoreError::invalid(format!(
            "participant identifier '{part}' contains the reserved separator '{KEY_SEPARATOR}'"
        )));
    }
    Ok(())
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ConversationKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ConversationKey {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ConversationKey> for String {
    fn from(key: ConversationKey) -> Self {
        key.0
    }
}

/// How the two identifiers are ordered inside a key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OriginMode {
    /// Ordinal sort; symmetric in its arguments.
    #[default]
    Canonical,
    /// The initiator's identifier comes first.
    InitiatorFirst,
    /// The responder's identifier comes first.
    ResponderFirst,
}

impl fmt::Display for OriginMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OriginMode::Canonical => write!(f, "canonical"),
            OriginMode::InitiatorFirst => write!(f, "initiator-first"),
            OriginMode::ResponderFirst => write!(f, "responder-first"),
        }
    }
}

impl FromStr for OriginMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "canonical" => Ok(OriginMode::Canonical),
            "initiator-first" | "initiator" => Ok(OriginMode::InitiatorFirst),
            "responder-first" | "responder" => Ok(OriginMode::ResponderFirst),
            other => Err(format!("invalid origin mode: '{other}'")),
        }
    }
}

/// The role a party plays in a directed conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyRole {
    Initiator,
    Responder,
}

/// A participant identifier tagged with its role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairParty<'a> {
    pub id: &'a str,
    pub role: PartyRole,
}

impl<'a> PairParty<'a> {
    pub fn initiator(id: &'a str) -> Self {
        Self {
            id,
            role: PartyRole::Initiator,
        }
    }

    pub fn responder(id: &'a str) -> Self {
        Self {
            id,
            role: PartyRole::Responder,
        }
    }
}

/// A durable, append-only message log between exactly two participants.
///
/// The participant pair is fixed at creation. `messages` is in commit order,
/// which under concurrent writers need not match `created_at` order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub key: ConversationKey,
    pub participants: Vec<String>,
    /// Owning application/twin, if the conversation belongs to one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Start an empty conversation for the participants encoded in `key`.
    pub fn new(key: ConversationKey, owner_id: Option<String>, now: DateTime<Utc>) -> Self {
        let (a, b) = key.participants();
        let participants = vec![a.to_string(), b.to_string()];
        Self {
            key,
            participants,
            owner_id,
            created_at: now,
            last_activity_at: now,
            messages: Vec::new(),
        }
    }

    pub fn has_participant(&self, id: &str) -> bool {
        self.participants.iter().any(|p| p == id)
    }

    /// The participant that is not `id`, if `id` is a participant.
    pub fn counterpart(&self, id: &str) -> Option<&str> {
        if !self.has_participant(id) {
            return None;
        }
        self.participants
            .iter()
            .find(|p| p.as_str() != id)
            .map(String::as_str)
    }

    pub fn find_message(&self, message_id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == message_id)
    }

    pub fn find_message_mut(&mut self, message_id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_from_parts() {
        let key = ConversationKey::from_parts("alice", "bob").unwrap();
        assert_eq!(key.as_str(), "alice_bob");
        assert_eq!(key.participants(), ("alice", "bob"));
        assert_eq!(key.document_key(), "conversation:alice_bob");
    }

    #[test]
    fn test_key_rejects_separator_and_empty() {
        assert!(ConversationKey::from_parts("al_ice", "bob").is_err());
        assert!(ConversationKey::from_parts("", "bob").is_err());
        assert!(ConversationKey::parse("alice").is_err());
        assert!(ConversationKey::parse("a_b_c").is_err());
    }

    #[test]
    fn test_key_serde_validates() {
        let key = ConversationKey::parse("alice_bob").unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"alice_bob\"");
        let parsed: ConversationKey = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, key);
        assert!(serde_json::from_str::<ConversationKey>("\"nobody\"").is_err());
    }

    #[test]
    fn test_origin_mode_parse() {
        assert_eq!("canonical".parse::<OriginMode>().unwrap(), OriginMode::Canonical);
        assert_eq!(
            "initiator_first".parse::<OriginMode>().unwrap(),
            OriginMode::InitiatorFirst
        );
        assert_eq!(
            "Responder-First".parse::<OriginMode>().unwrap(),
            OriginMode::ResponderFirst
        );
        assert!("sideways".parse::<OriginMode>().is_err());
        assert_eq!(OriginMode::default(), OriginMode::Canonical);
    }

    #[test]
    fn test_new_conversation_participants() {
        let key = ConversationKey::parse("alice_bob").unwrap();
        let conv = Conversation::new(key, Some("twin-1".into()), Utc::now());
        assert!(conv.has_participant("alice"));
        assert!(conv.has_participant("bob"));
        assert!(!conv.has_participant("carol"));
        assert_eq!(conv.counterpart("alice"), Some("bob"));
        assert_eq!(conv.counterpart("carol"), None);
        assert!(conv.messages.is_empty());
    }
}
