//! Conversation store adapter.
//!
//! Maps [`Conversation`] documents onto a [`DocumentStore`]: one document per
//! conversation under `conversation:<key>`, every mutation committed through
//! [`read_modify_write`] so concurrent senders never lose each other's
//! messages.

use chrono::Utc;
use tandem_types::config::StoreConfig;
use tandem_types::conversation::{Conversation, ConversationKey};
use tandem_types::error::CoreError;
use tandem_types::message::Message;
use tracing::{debug, info};

use crate::conversation::lifecycle::{AppendOutcome, append_message};
use crate::deadline::within;
use crate::store::{DocumentStore, Mutation, read_modify_write};

/// Result of [`ConversationStore::upsert_message`].
#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub conversation: Conversation,
    /// The stored message: the new one, or the original on a duplicate id.
    pub message: Message,
    pub inserted: bool,
    pub cost: f64,
}

/// Result of [`ConversationStore::modify`] on an existing conversation.
#[derive(Debug, Clone)]
pub struct Modified<R> {
    pub conversation: Conversation,
    pub output: R,
    pub written: bool,
    pub cost: f64,
}

pub struct ConversationStore<S: DocumentStore> {
    store: S,
    policy: StoreConfig,
}

impl<S: DocumentStore> ConversationStore<S> {
    pub fn new(store: S, policy: StoreConfig) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &StoreConfig {
        &self.policy
    }

    /// Fetch a conversation. A miss is `Ok(None)`.
    pub async fn get(&self, key: &ConversationKey) -> Result<Option<Conversation>, CoreError> {
        let fetched = within(
            "store get",
            self.policy.operation_timeout(),
            self.store.get(&key.document_key()),
        )
        .await??;

        match fetched {
            Some(doc) => {
                debug!(key = %key, cost = doc.cost, "conversation fetched");
                let conversation = serde_json::from_value(doc.body).map_err(|e| {
                    CoreError::StoreUnavailable(format!("unreadable conversation '{key}': {e}"))
                })?;
                Ok(Some(conversation))
            }
            None => Ok(None),
        }
    }

    /// Append `message` to the conversation at `key`, creating the
    /// conversation on first use. Idempotent by message id.
    pub async fn upsert_message(
        &self,
        key: &ConversationKey,
        owner_id: Option<&str>,
        message: Message,
    ) -> Result<UpsertOutcome, CoreError> {
        self.upsert_message_with(key, owner_id, message, |conversation, message| {
            Ok(append_message(&mut conversation.messages, message.clone()))
        })
        .await
    }

    /// [`Self::upsert_message`] with a caller-supplied merge.
    ///
    /// `merge` is applied to the freshly fetched (or newly seeded)
    /// conversation on every attempt; returning `Duplicate` skips the write.
    pub async fn upsert_message_with<M>(
        &self,
        key: &ConversationKey,
        owner_id: Option<&str>,
        message: Message,
        mut merge: M,
    ) -> Result<UpsertOutcome, CoreError>
    where
        M: FnMut(&mut Conversation, &Message) -> Result<AppendOutcome, CoreError>,
    {
        let now = Utc::now();
        let outcome = read_modify_write(
            &self.store,
            &key.document_key(),
            &self.policy,
            |doc: &mut Option<Conversation>| {
                let conversation = doc.get_or_insert_with(|| {
                    Conversation::new(key.clone(), owner_id.map(str::to_string), now)
                });
                match merge(conversation, &message)? {
                    AppendOutcome::Appended => {
                        conversation.last_activity_at = now;
                        Ok(Mutation::Write(true))
                    }
                    AppendOutcome::Duplicate => Ok(Mutation::Unchanged(false)),
                }
            },
        )
        .await?;

        let conversation = outcome
            .document
            .ok_or_else(|| CoreError::NotFound(format!("conversation '{key}'")))?;
        let stored = conversation
            .find_message(&message.id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("message '{}' in '{key}'", message.id)))?;

        if outcome.output {
            info!(key = %key, message_id = %stored.id, attempts = outcome.attempts, cost = outcome.cost, "message appended");
        } else {
            debug!(key = %key, message_id = %stored.id, "duplicate message id; nothing written");
        }

        Ok(UpsertOutcome {
            conversation,
            message: stored,
            inserted: outcome.output,
            cost: outcome.cost,
        })
    }

    /// Apply `mutate` to an existing conversation.
    ///
    /// Returns `Ok(None)` without writing when the conversation does not exist.
    pub async fn modify<R, F>(
        &self,
        key: &ConversationKey,
        mut mutate: F,
    ) -> Result<Option<Modified<R>>, CoreError>
    where
        F: FnMut(&mut Conversation) -> Result<Mutation<R>, CoreError>,
    {
        let outcome = read_modify_write(
            &self.store,
            &key.document_key(),
            &self.policy,
            |doc: &mut Option<Conversation>| match doc {
                Some(conversation) => mutate(conversation).map(|m| m.map(Some)),
                None => Ok(Mutation::Unchanged(None)),
            },
        )
        .await?;

        Ok(match (outcome.document, outcome.output) {
            (Some(conversation), Some(output)) => Some(Modified {
                conversation,
                output,
                written: outcome.written,
                cost: outcome.cost,
            }),
            _ => None,
        })
    }
}
