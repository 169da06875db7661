//! Conversation service: send, mark-read, and query for two-party threads.
//!
//! ConversationService resolves the conversation key from the two parties,
//! builds the message, commits it through the [`ConversationStore`], and then
//! confirms delivery in a follow-up merge. Every operation is idempotent by
//! message id, so a caller may retry any failure.

use chrono::Utc;
use tandem_types::conversation::{Conversation, ConversationKey, PairParty, PartyRole};
use tandem_types::error::CoreError;
use tandem_types::message::{EnrichedMessage, Message, NewMessage, ReadReceipt, SendMessageRequest};
use tracing::{debug, info};

use crate::conversation::lifecycle;
use crate::conversation::store::{ConversationStore, UpsertOutcome};
use crate::pairing;
use crate::store::{DocumentStore, Mutation};

/// Generic over `DocumentStore` so tandem-core never depends on tandem-infra.
pub struct ConversationService<S: DocumentStore> {
    store: ConversationStore<S>,
}

impl<S: DocumentStore> ConversationService<S> {
    pub fn new(store: ConversationStore<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ConversationStore<S> {
        &self.store
    }

    /// Send a two-party message.
    ///
    /// Resolves the key from sender/recipient (honouring `origin` and
    /// `sender_role`), appends the message unless its id is already stored,
    /// then marks it delivered. Resending a stored id returns the stored
    /// message and completes a delivery confirmation that an earlier attempt
    /// may not have reached.
    pub async fn send(&self, request: SendMessageRequest) -> Result<UpsertOutcome, CoreError> {
        let recipient_role = match request.sender_role {
            PartyRole::Initiator => PartyRole::Responder,
            PartyRole::Responder => PartyRole::Initiator,
        };
        let key = pairing::resolve(
            PairParty {
                id: &request.sender_id,
                role: request.sender_role,
            },
            PairParty {
                id: &request.recipient_id,
                role: recipient_role,
            },
            request.origin,
        )?;

        let draft = NewMessage {
            id: request.message_id,
            sender_id: request.sender_id,
            recipient_id: Some(request.recipient_id),
            body: request.body,
            voice: request.voice,
        };
        let message = Message::from_draft(draft, Utc::now())?;
        let message_id = message.id.clone();

        let mut outcome = self
            .store
            .upsert_message(&key, request.owner_id.as_deref(), message)
            .await?;

        if outcome.message.is_delivered {
            return Ok(outcome);
        }

        let delivered = self
            .store
            .modify(&key, |conversation| {
                let Some(message) = conversation.find_message_mut(&message_id) else {
                    return Ok(Mutation::Unchanged(()));
                };
                Ok(if lifecycle::mark_delivered(message, Utc::now()) {
                    Mutation::Write(())
                } else {
                    Mutation::Unchanged(())
                })
            })
            .await?;

        if let Some(delivered) = delivered {
            if let Some(message) = delivered.conversation.find_message(&message_id) {
                outcome.message = message.clone();
            }
            outcome.cost += delivered.cost;
            outcome.conversation = delivered.conversation;
        }

        info!(
            key = %key,
            message_id = %message_id,
            inserted = outcome.inserted,
            cost = outcome.cost,
            "message sent"
        );
        Ok(outcome)
    }

    /// Mark `message_ids` as read by `reader`.
    ///
    /// A missing conversation is not an error: every id is reported as not
    /// found. Nothing is written when no message changed.
    pub async fn mark_read(
        &self,
        key: &ConversationKey,
        message_ids: &[String],
        reader: &str,
    ) -> Result<ReadReceipt, CoreError> {
        let reader = require_identity(reader, "reader")?;

        let modified = self
            .store
            .modify(key, |conversation| {
                let receipt =
                    lifecycle::mark_read(&mut conversation.messages, message_ids, reader, Utc::now());
                Ok(if receipt.changed() {
                    Mutation::Write(receipt)
                } else {
                    Mutation::Unchanged(receipt)
                })
            })
            .await?;

        let receipt = match modified {
            Some(modified) => modified.output,
            None => ReadReceipt {
                not_found: message_ids.len() as u32,
                ..ReadReceipt::default()
            },
        };
        debug!(
            key = %key,
            reader,
            marked = receipt.marked.len(),
            not_found = receipt.not_found,
            "read receipts applied"
        );
        Ok(receipt)
    }

    /// Enriched view of the conversation for `requester`, in commit order.
    pub async fn get_messages(
        &self,
        key: &ConversationKey,
        requester: &str,
        unread_only: bool,
    ) -> Result<Vec<EnrichedMessage>, CoreError> {
        let requester = require_identity(requester, "requester")?;
        Ok(self
            .store
            .get(key)
            .await?
            .map(|c| lifecycle::enrich_all(&c.messages, requester, unread_only))
            .unwrap_or_default())
    }

    pub async fn unread_count(
        &self,
        key: &ConversationKey,
        requester: &str,
    ) -> Result<usize, CoreError> {
        let requester = require_identity(requester, "requester")?;
        Ok(self
            .store
            .get(key)
            .await?
            .map(|c| lifecycle::unread_count(&c.messages, requester))
            .unwrap_or(0))
    }

    pub async fn get_conversation(
        &self,
        key: &ConversationKey,
    ) -> Result<Option<Conversation>, CoreError> {
        self.store.get(key).await
    }
}

pub(crate) fn require_identity<'a>(id: &'a str, what: &str) -> Result<&'a str, CoreError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(CoreError::invalid(format!("{what} id is empty")));
    }
    Ok(id)
}
