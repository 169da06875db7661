//! Group session manager.
//!
//! Sessions are stored one document per session under `session:<id>` and
//! mutated only through the read-modify-write loop. When a message mentions
//! an assistant participant, the manager takes the assistant's turn
//! synchronously through the completion collaborator and stores the reply.
//!
//! The continuation-state blob is never inspected: the caller's value is
//! forwarded to the collaborator verbatim, and the collaborator's value is
//! stored and returned verbatim.

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use tandem_types::collaborator::CompletionRequest;
use tandem_types::config::{SessionConfig, StoreConfig};
use tandem_types::error::CoreError;
use tandem_types::message::{EnrichedMessage, Message, NewMessage, ReadReceipt};
use tandem_types::session::{
    MIN_SESSION_PARTICIPANTS, Participant, Session, SessionSendOutcome,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::collaborator::CompletionCollaborator;
use crate::conversation::lifecycle::{self, AppendOutcome};
use crate::conversation::service::require_identity;
use crate::deadline::within;
use crate::session::mention::mentioned_assistant;
use crate::store::{DocumentStore, Mutation, read_modify_write};

const DEFAULT_COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(30);

pub struct GroupSessionManager<S: DocumentStore, C: CompletionCollaborator> {
    store: S,
    collaborator: C,
    policy: StoreConfig,
    mention_prefix: String,
    collaborator_timeout: Duration,
}

impl<S: DocumentStore, C: CompletionCollaborator> GroupSessionManager<S, C> {
    pub fn new(store: S, collaborator: C, policy: StoreConfig) -> Self {
        Self {
            store,
            collaborator,
            policy,
            mention_prefix: SessionConfig::default().mention_prefix,
            collaborator_timeout: DEFAULT_COLLABORATOR_TIMEOUT,
        }
    }

    pub fn with_sessions(mut self, sessions: &SessionConfig) -> Self {
        self.mention_prefix = sessions.mention_prefix.clone();
        self
    }

    pub fn with_collaborator_timeout(mut self, timeout: Duration) -> Self {
        self.collaborator_timeout = timeout;
        self
    }

    /// Create a session with at least two distinct participants.
    ///
    /// Re-creating an existing id with the same participant set returns the
    /// stored session; a different participant set is rejected.
    pub async fn create_session(
        &self,
        participants: Vec<Participant>,
        name: Option<String>,
        id: Option<String>,
    ) -> Result<Session, CoreError> {
        if participants.len() < MIN_SESSION_PARTICIPANTS {
            return Err(CoreError::invalid(format!(
                "a session needs at least {MIN_SESSION_PARTICIPANTS} participants, got {}",
                participants.len()
            )));
        }

        let mut seen = HashSet::new();
        let mut founding = Vec::with_capacity(participants.len());
        for mut participant in participants {
            participant.id = require_identity(&participant.id, "participant")?.to_string();
            if !seen.insert(participant.id.clone()) {
                return Err(CoreError::invalid(format!(
                    "participant '{}' listed more than once",
                    participant.id
                )));
            }
            if participant.display_name.trim().is_empty() {
                participant.display_name = participant.id.clone();
            }
            founding.push(participant);
        }

        let id = match id {
            Some(id) => require_identity(&id, "session")?.to_string(),
            None => Uuid::now_v7().to_string(),
        };
        let now = Utc::now();

        let outcome = read_modify_write(
            &self.store,
            &Session::document_key(&id),
            &self.policy,
            |doc: &mut Option<Session>| {
                if let Some(existing) = doc.as_ref() {
                    let stored: HashSet<&str> =
                        existing.participants.iter().map(|p| p.id.as_str()).collect();
                    let same_members = stored.len() == founding.len()
                        && founding.iter().all(|p| stored.contains(p.id.as_str()));
                    return if same_members {
                        Ok(Mutation::Unchanged(()))
                    } else {
                        Err(CoreError::invalid(format!(
                            "session '{id}' already exists with different participants"
                        )))
                    };
                }
                *doc = Some(Session {
                    id: id.clone(),
                    name: name.clone(),
                    participants: founding.clone(),
                    context: None,
                    messages: Vec::new(),
                    created_at: now,
                    last_activity_at: now,
                });
                Ok(Mutation::Write(()))
            },
        )
        .await?;

        let session = outcome
            .document
            .ok_or_else(|| CoreError::NotFound(format!("session '{id}'")))?;
        if outcome.written {
            info!(session_id = %session.id, participants = session.participants.len(), "session created");
        }
        Ok(session)
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Option<Session>, CoreError> {
        let session_id = require_identity(session_id, "session")?;
        let fetched = within(
            "store get",
            self.policy.operation_timeout(),
            self.store.get(&Session::document_key(session_id)),
        )
        .await??;

        match fetched {
            Some(doc) => serde_json::from_value(doc.body).map(Some).map_err(|e| {
                CoreError::StoreUnavailable(format!("unreadable session '{session_id}': {e}"))
            }),
            None => Ok(None),
        }
    }

    /// Append a message and, when it mentions an assistant participant, take
    /// that assistant's turn.
    ///
    /// Without a mention `updated_context` is exactly `context`. Replaying a
    /// stored message id does not append twice; if its assistant reply is
    /// missing (an earlier collaborator failure), the turn is taken now.
    pub async fn send_message(
        &self,
        session_id: &str,
        draft: NewMessage,
        context: Option<String>,
    ) -> Result<SessionSendOutcome, CoreError> {
        let session_id = require_identity(session_id, "session")?;
        let message = Message::from_draft(draft, Utc::now())?;
        let message_id = message.id.clone();

        let (session, inserted) = self
            .modify_session(session_id, |session| {
                if !session.has_participant(&message.sender_id) {
                    return Err(CoreError::invalid(format!(
                        "'{}' is not a participant of session '{}'",
                        message.sender_id, session.id
                    )));
                }
                if let Some(recipient) = &message.recipient_id {
                    if !session.has_participant(recipient) {
                        return Err(CoreError::invalid(format!(
                            "'{recipient}' is not a participant of session '{}'",
                            session.id
                        )));
                    }
                }
                Ok(
                    match lifecycle::append_message(&mut session.messages, message.clone()) {
                        AppendOutcome::Appended => {
                            session.last_activity_at = Utc::now();
                            Mutation::Write(true)
                        }
                        AppendOutcome::Duplicate => Mutation::Unchanged(false),
                    },
                )
            })
            .await?;

        let stored = session
            .find_message(&message_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("message '{message_id}'")))?;
        debug!(session_id, message_id = %message_id, inserted, "session message stored");

        let stored = self.deliver(session_id, &stored).await?;

        let Some(assistant) =
            mentioned_assistant(&session, &stored.body, &self.mention_prefix, &stored.sender_id)
        else {
            return Ok(SessionSendOutcome {
                message: stored,
                reply: None,
                updated_context: context,
            });
        };

        if let Some(existing) = session.reply_to(&message_id) {
            debug!(session_id, reply_id = %existing.id, "assistant turn already taken");
            return Ok(SessionSendOutcome {
                message: stored,
                reply: Some(existing.clone()),
                updated_context: session.context.clone(),
            });
        }

        let request = CompletionRequest::new(stored.body.clone())
            .with_instruction(format!(
                "Eres {}, participante de la sesión{}. Responde al mensaje de {}.",
                assistant.display_name,
                session
                    .name
                    .as_deref()
                    .map(|n| format!(" \"{n}\""))
                    .unwrap_or_default(),
                session
                    .participant(&stored.sender_id)
                    .map(|p| p.display_name.as_str())
                    .unwrap_or(stored.sender_id.as_str()),
            ))
            .with_context(context);

        let completion = within(
            "collaborator completion",
            self.collaborator_timeout,
            self.collaborator.complete(&request),
        )
        .await?
        .map_err(|e| {
            warn!(session_id, assistant = %assistant.id, error = %e, "assistant turn failed");
            CoreError::from(e)
        })?;

        let mut reply = Message::from_draft(
            NewMessage::text(assistant.id.clone(), None, completion.text),
            Utc::now(),
        )
        .map_err(|_| CoreError::CollaboratorFailure("assistant returned an empty reply".into()))?;
        reply.reply_to = Some(message_id.clone());

        let updated_context = completion.context;
        let (session, _) = self
            .modify_session(session_id, |session| {
                // A concurrent send of the same message may have stored a reply first.
                if session.reply_to(&message_id).is_some() {
                    return Ok(Mutation::Unchanged(()));
                }
                let appended = lifecycle::append_message(&mut session.messages, reply.clone());
                if appended == AppendOutcome::Appended {
                    session.context = updated_context.clone();
                    session.last_activity_at = Utc::now();
                    Ok(Mutation::Write(()))
                } else {
                    Ok(Mutation::Unchanged(()))
                }
            })
            .await?;

        let reply = session
            .reply_to(&message_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("reply to message '{message_id}'")))?;
        let reply = self.deliver(session_id, &reply).await?;

        info!(session_id, assistant = %assistant.id, reply_id = %reply.id, "assistant turn completed");
        Ok(SessionSendOutcome {
            message: stored,
            reply: Some(reply),
            updated_context: session.context.clone(),
        })
    }

    pub async fn get_messages(
        &self,
        session_id: &str,
        requester: &str,
        unread_only: bool,
    ) -> Result<Vec<EnrichedMessage>, CoreError> {
        let requester = require_identity(requester, "requester")?;
        let session = self
            .get_session(session_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("session '{session_id}'")))?;
        Ok(lifecycle::enrich_all(&session.messages, requester, unread_only))
    }

    /// Record per-reader receipts for `message_ids`.
    pub async fn mark_read(
        &self,
        session_id: &str,
        message_ids: &[String],
        reader: &str,
    ) -> Result<ReadReceipt, CoreError> {
        let session_id = require_identity(session_id, "session")?;
        let reader = require_identity(reader, "reader")?;

        let (_, receipt) = self
            .modify_session(session_id, |session| {
                if !session.has_participant(reader) {
                    return Err(CoreError::invalid(format!(
                        "'{reader}' is not a participant of session '{}'",
                        session.id
                    )));
                }
                let receipt =
                    lifecycle::mark_read(&mut session.messages, message_ids, reader, Utc::now());
                Ok(if receipt.changed() {
                    Mutation::Write(receipt)
                } else {
                    Mutation::Unchanged(receipt)
                })
            })
            .await?;
        Ok(receipt)
    }

    /// Add a participant after creation. Already-present ids are a no-op.
    pub async fn add_participant(
        &self,
        session_id: &str,
        mut participant: Participant,
    ) -> Result<Session, CoreError> {
        let session_id = require_identity(session_id, "session")?;
        participant.id = require_identity(&participant.id, "participant")?.to_string();
        if participant.display_name.trim().is_empty() {
            participant.display_name = participant.id.clone();
        }

        let (session, added) = self
            .modify_session(session_id, |session| {
                if session.has_participant(&participant.id) {
                    return Ok(Mutation::Unchanged(false));
                }
                session.participants.push(participant.clone());
                Ok(Mutation::Write(true))
            })
            .await?;
        if added {
            info!(session_id, participant = %participant.id, "participant joined");
        }
        Ok(session)
    }

    pub async fn set_presence(
        &self,
        session_id: &str,
        participant_id: &str,
        online: bool,
    ) -> Result<Session, CoreError> {
        let session_id = require_identity(session_id, "session")?;
        let participant_id = require_identity(participant_id, "participant")?;

        let (session, _) = self
            .modify_session(session_id, |session| {
                let Some(participant) = session.participant_mut(participant_id) else {
                    return Err(CoreError::NotFound(format!(
                        "participant '{participant_id}' in session '{session_id}'"
                    )));
                };
                participant.online = online;
                participant.last_seen = Some(Utc::now());
                Ok(Mutation::Write(()))
            })
            .await?;
        Ok(session)
    }

    /// Mark `message` delivered in a follow-up merge.
    async fn deliver(&self, session_id: &str, message: &Message) -> Result<Message, CoreError> {
        if message.is_delivered {
            return Ok(message.clone());
        }
        let (session, _) = self
            .modify_session(session_id, |session| {
                let changed = session
                    .messages
                    .iter_mut()
                    .find(|m| m.id == message.id)
                    .map(|m| lifecycle::mark_delivered(m, Utc::now()))
                    .unwrap_or(false);
                Ok(if changed {
                    Mutation::Write(())
                } else {
                    Mutation::Unchanged(())
                })
            })
            .await?;
        Ok(session
            .find_message(&message.id)
            .cloned()
            .unwrap_or_else(|| message.clone()))
    }

    /// Read-modify-write an existing session; a missing one is `NotFound`.
    async fn modify_session<R, F>(&self, session_id: &str, mut mutate: F) -> Result<(Session, R), CoreError>
    where
        F: FnMut(&mut Session) -> Result<Mutation<R>, CoreError>,
    {
        let outcome = read_modify_write(
            &self.store,
            &Session::document_key(session_id),
            &self.policy,
            |doc: &mut Option<Session>| match doc {
                Some(session) => mutate(session),
                None => Err(CoreError::NotFound(format!("session '{session_id}'"))),
            },
        )
        .await?;

        let session = outcome
            .document
            .ok_or_else(|| CoreError::NotFound(format!("session '{session_id}'")))?;
        Ok((session, outcome.output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_types::error::{CollaboratorError, ErrorKind};
    use tandem_types::message::MessageStatus;

    use crate::store::MemoryDocumentStore;
    use crate::testing::ScriptedCollaborator;

    fn policy() -> StoreConfig {
        StoreConfig {
            max_attempts: 3,
            retry_backoff_ms: 1,
            operation_timeout_ms: 1_000,
        }
    }

    fn manager(
        collaborator: ScriptedCollaborator,
    ) -> GroupSessionManager<MemoryDocumentStore, ScriptedCollaborator> {
        GroupSessionManager::new(MemoryDocumentStore::new(), collaborator, policy())
    }

    fn family() -> Vec<Participant> {
        vec![
            Participant::human("alice", "Alice"),
            Participant::human("bob", "Bob"),
            Participant::assistant("tandem", "Tandem"),
        ]
    }

    async fn create(manager: &GroupSessionManager<MemoryDocumentStore, ScriptedCollaborator>) {
        manager
            .create_session(family(), Some("Familia".into()), Some("s1".into()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn single_participant_rejected() {
        let manager = manager(ScriptedCollaborator::new());
        let err = manager
            .create_session(vec![Participant::human("alice", "Alice")], None, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn duplicate_and_blank_participants_rejected() {
        let manager = manager(ScriptedCollaborator::new());
        let dup = vec![Participant::human("alice", "A"), Participant::human(" alice ", "B")];
        assert!(manager.create_session(dup, None, None).await.is_err());

        let blank = vec![Participant::human("alice", "A"), Participant::human("  ", "B")];
        assert!(manager.create_session(blank, None, None).await.is_err());
    }

    #[tokio::test]
    async fn create_generates_id_and_is_idempotent() {
        let manager = manager(ScriptedCollaborator::new());
        let session = manager.create_session(family(), None, None).await.unwrap();
        assert!(!session.id.is_empty());
        assert_eq!(session.participants.len(), 3);

        let again = manager
            .create_session(family(), None, Some(session.id.clone()))
            .await
            .unwrap();
        assert_eq!(again.created_at, session.created_at);

        let err = manager
            .create_session(
                vec![Participant::human("alice", "A"), Participant::human("carol", "C")],
                None,
                Some(session.id),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn plain_message_passes_context_through() {
        let collaborator = ScriptedCollaborator::new();
        let manager = manager(collaborator);
        create(&manager).await;

        let blob = Some("v2:{\"opaque\": [1, 2, 3]}  \n".to_string());
        let outcome = manager
            .send_message("s1", NewMessage::text("alice", None, "hola a todos"), blob.clone())
            .await
            .unwrap();

        assert_eq!(outcome.updated_context, blob);
        assert!(outcome.reply.is_none());
        assert_eq!(outcome.message.status(), MessageStatus::Delivered);
        assert!(manager.collaborator.requests().is_empty());
    }

    #[tokio::test]
    async fn mention_takes_assistant_turn() {
        let collaborator = ScriptedCollaborator::new().reply("**Claro**, mañana a las 10.", Some("ctx-2"));
        let manager = manager(collaborator);
        create(&manager).await;

        let outcome = manager
            .send_message(
                "s1",
                NewMessage::text("alice", None, "@tandem ¿qué tenemos mañana?").with_id("m1"),
                Some("ctx-1".into()),
            )
            .await
            .unwrap();

        let reply = outcome.reply.expect("assistant reply");
        assert_eq!(reply.sender_id, "tandem");
        assert_ne!(reply.id, "m1");
        assert_eq!(reply.reply_to.as_deref(), Some("m1"));
        assert!(reply.recipient_id.is_none());
        assert!(reply.is_delivered);
        assert_eq!(outcome.updated_context.as_deref(), Some("ctx-2"));

        let requests = manager.collaborator.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].context.as_deref(), Some("ctx-1"));
        assert_eq!(requests[0].prompt, "@tandem ¿qué tenemos mañana?");

        let session = manager.get_session("s1").await.unwrap().unwrap();
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.context.as_deref(), Some("ctx-2"));
    }

    #[tokio::test]
    async fn context_round_trips_unchanged() {
        let collaborator = ScriptedCollaborator::new()
            .reply("uno", Some("\u{1F512}blob\0with\tbytes "))
            .reply("dos", Some("next"));
        let manager = manager(collaborator);
        create(&manager).await;

        let first = manager
            .send_message("s1", NewMessage::text("bob", None, "@tandem hola"), None)
            .await
            .unwrap();
        let handed_back = first.updated_context.clone();

        manager
            .send_message("s1", NewMessage::text("bob", None, "@tandem otra vez"), handed_back.clone())
            .await
            .unwrap();

        let requests = manager.collaborator.requests();
        assert_eq!(requests[1].context, handed_back);
    }

    #[tokio::test]
    async fn replay_does_not_repeat_turn() {
        let collaborator = ScriptedCollaborator::new().reply("listo", Some("ctx-2"));
        let manager = manager(collaborator);
        create(&manager).await;

        let draft = NewMessage::text("alice", None, "@tandem apunta esto").with_id("m1");
        manager
            .send_message("s1", draft.clone(), Some("ctx-1".into()))
            .await
            .unwrap();
        let replay = manager
            .send_message("s1", draft, Some("ctx-1".into()))
            .await
            .unwrap();

        assert_eq!(replay.reply.map(|r| r.body), Some("listo".to_string()));
        assert_eq!(replay.updated_context.as_deref(), Some("ctx-2"));
        assert_eq!(manager.collaborator.requests().len(), 1);
        assert_eq!(manager.get_session("s1").await.unwrap().unwrap().messages.len(), 2);
    }

    #[tokio::test]
    async fn caller_message_cannot_pose_as_reply() {
        let collaborator = ScriptedCollaborator::new().reply("de nada", Some("ctx-2"));
        let manager = manager(collaborator);
        create(&manager).await;

        manager
            .send_message("s1", NewMessage::text("alice", None, "nota").with_id("m1:reply"), None)
            .await
            .unwrap();
        let outcome = manager
            .send_message(
                "s1",
                NewMessage::text("alice", None, "@tandem hola").with_id("m1"),
                Some("ctx-1".into()),
            )
            .await
            .unwrap();

        let reply = outcome.reply.expect("assistant reply");
        assert_eq!(reply.sender_id, "tandem");
        assert_eq!(reply.body, "de nada");
        assert_eq!(outcome.updated_context.as_deref(), Some("ctx-2"));
        assert_eq!(manager.collaborator.requests().len(), 1);
        assert_eq!(manager.get_session("s1").await.unwrap().unwrap().messages.len(), 3);
    }

    #[tokio::test]
    async fn collaborator_failure_keeps_message_and_retry_recovers() {
        let collaborator = ScriptedCollaborator::new()
            .fail(CollaboratorError::Request("503".into()))
            .reply("ya estoy", Some("ctx-9"));
        let manager = manager(collaborator);
        create(&manager).await;

        let draft = NewMessage::text("alice", None, "@tandem ¿estás?").with_id("m1");
        let err = manager
            .send_message("s1", draft.clone(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CollaboratorFailure);
        assert_eq!(manager.get_session("s1").await.unwrap().unwrap().messages.len(), 1);

        let retried = manager.send_message("s1", draft, None).await.unwrap();
        assert_eq!(retried.reply.map(|r| r.body), Some("ya estoy".to_string()));
        assert_eq!(retried.updated_context.as_deref(), Some("ctx-9"));
    }

    #[tokio::test]
    async fn non_participant_and_missing_session() {
        let manager = manager(ScriptedCollaborator::new());
        create(&manager).await;

        let err = manager
            .send_message("s1", NewMessage::text("mallory", None, "hola"), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = manager
            .send_message("nope", NewMessage::text("alice", None, "hola"), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn unread_filter_and_read_receipts() {
        let manager = manager(ScriptedCollaborator::new());
        create(&manager).await;
        manager
            .send_message("s1", NewMessage::text("alice", None, "uno").with_id("m1"), None)
            .await
            .unwrap();
        manager
            .send_message("s1", NewMessage::text("alice", Some("bob".into()), "dos").with_id("m2"), None)
            .await
            .unwrap();

        assert_eq!(manager.get_messages("s1", "bob", true).await.unwrap().len(), 2);
        assert_eq!(manager.get_messages("s1", "tandem", true).await.unwrap().len(), 1);
        assert_eq!(manager.get_messages("s1", "alice", false).await.unwrap().len(), 2);

        let receipt = manager
            .mark_read("s1", &["m1".to_string(), "m2".to_string()], "bob")
            .await
            .unwrap();
        assert_eq!(receipt.marked.len(), 2);
        assert!(manager.get_messages("s1", "bob", true).await.unwrap().is_empty());
        assert_eq!(manager.get_messages("s1", "tandem", true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn join_and_presence() {
        let manager = manager(ScriptedCollaborator::new());
        create(&manager).await;

        let session = manager
            .add_participant("s1", Participant::human("carol", "Carol"))
            .await
            .unwrap();
        assert_eq!(session.participants.len(), 4);
        let session = manager
            .add_participant("s1", Participant::human("carol", "Carol"))
            .await
            .unwrap();
        assert_eq!(session.participants.len(), 4);

        let session = manager.set_presence("s1", "carol", true).await.unwrap();
        let carol = session.participant("carol").unwrap();
        assert!(carol.online);
        assert!(carol.last_seen.is_some());

        let err = manager.set_presence("s1", "ghost", true).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
