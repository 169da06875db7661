//! Message lifecycle engine.
//!
//! Pure functions over message lists, shared by conversations and group
//! sessions. Transitions only move forward: a delivered message is never
//! undelivered, a read message is never unread, and re-marking never touches
//! the original timestamp.

use chrono::{DateTime, Utc};
use tandem_types::message::{EnrichedMessage, Message, ReadReceipt};

/// Result of appending to an append-only message list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    /// A message with the same id is already stored; nothing was appended.
    Duplicate,
}

/// Append `message` unless a message with the same id is already present.
pub fn append_message(messages: &mut Vec<Message>, message: Message) -> AppendOutcome {
    if messages.iter().any(|m| m.id == message.id) {
        return AppendOutcome::Duplicate;
    }
    messages.push(message);
    AppendOutcome::Appended
}

/// Returns `true` if the message changed.
pub fn mark_delivered(message: &mut Message, now: DateTime<Utc>) -> bool {
    if message.is_delivered {
        return false;
    }
    message.is_delivered = true;
    message.delivered_at = Some(now);
    true
}

/// Mark the messages in `ids` as read by `reader`.
///
/// Only messages addressed to `reader` (directly, or broadcast and not sent
/// by `reader`) are eligible. Broadcast messages record a per-reader receipt
/// in `read_by`; the message-level `is_read`/`read_at` pair records the first
/// reader.
pub fn mark_read(
    messages: &mut [Message],
    ids: &[String],
    reader: &str,
    now: DateTime<Utc>,
) -> ReadReceipt {
    let mut receipt = ReadReceipt::default();

    for id in ids {
        let Some(message) = messages.iter_mut().find(|m| m.id == *id) else {
            receipt.not_found += 1;
            continue;
        };
        if !message.is_addressed_to(reader) {
            receipt.not_addressed += 1;
            continue;
        }
        if message.is_read_by(reader) {
            receipt.already_read += 1;
            continue;
        }

        mark_delivered(message, now);
        if message.recipient_id.is_none() {
            message.read_by.insert(reader.to_string(), now);
        }
        if !message.is_read {
            message.is_read = true;
            message.read_at = Some(now);
        }
        receipt.marked.push(id.clone());
    }

    receipt
}

/// Not sent by `requester`, addressed to them, and not yet read by them.
pub fn needs_read_confirmation(message: &Message, requester: &str) -> bool {
    message.is_addressed_to(requester) && !message.is_read_by(requester)
}

pub fn enrich(message: &Message, requester: &str) -> EnrichedMessage {
    EnrichedMessage {
        message: message.clone(),
        status: message.status(),
        is_mine: message.sender_id == requester,
        is_for_me: message.is_for(requester),
        needs_read_confirmation: needs_read_confirmation(message, requester),
    }
}

/// Enriched view of a message list in commit order.
pub fn enrich_all(messages: &[Message], requester: &str, unread_only: bool) -> Vec<EnrichedMessage> {
    messages
        .iter()
        .map(|m| enrich(m, requester))
        .filter(|e| !unread_only || e.needs_read_confirmation)
        .collect()
}

pub fn unread_count(messages: &[Message], requester: &str) -> usize {
    messages
        .iter()
        .filter(|m| needs_read_confirmation(m, requester))
        .count()
}
