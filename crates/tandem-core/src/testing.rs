//! Test doubles shared by the unit tests in this crate.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tandem_types::collaborator::{Completion, CompletionRequest};
use tandem_types::error::{CollaboratorError, StoreError};
use tandem_types::store::{StoredDocument, WriteCondition, WriteReceipt};

use crate::collaborator::CompletionCollaborator;
use crate::store::{DocumentStore, MemoryDocumentStore};

type Interloper = Box<dyn Fn(&mut serde_json::Value) + Send + Sync>;

/// Wraps a [`MemoryDocumentStore`] and simulates a competing writer.
///
/// For the first `conflicts` writes, the interloper commits its own edit to
/// the stored document just before the caller's write lands, so the caller's
/// token is stale and the write conflicts. When the document does not exist
/// yet, the write simply conflicts.
pub(crate) struct ContendedStore {
    inner: MemoryDocumentStore,
    remaining: AtomicU32,
    interloper: Interloper,
    puts: AtomicU32,
}

impl ContendedStore {
    pub(crate) fn new(
        inner: MemoryDocumentStore,
        conflicts: u32,
        interloper: impl Fn(&mut serde_json::Value) + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner,
            remaining: AtomicU32::new(conflicts),
            interloper: Box::new(interloper),
            puts: AtomicU32::new(0),
        }
    }

    pub(crate) fn put_attempts(&self) -> u32 {
        self.puts.load(Ordering::SeqCst)
    }
}

impl DocumentStore for ContendedStore {
    async fn get(&self, key: &str) -> Result<Option<StoredDocument>, StoreError> {
        self.inner.get(key).await
    }

    async fn put(
        &self,
        key: &str,
        body: &serde_json::Value,
        condition: WriteCondition,
    ) -> Result<WriteReceipt, StoreError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        let contended = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        if contended {
            let Some(current) = self.inner.get(key).await? else {
                return Err(StoreError::Conflict(key.to_string()));
            };
            let mut competing = current.body;
            (self.interloper)(&mut competing);
            self.inner
                .put(key, &competing, WriteCondition::IfMatch(current.token))
                .await?;
        }

        self.inner.put(key, body, condition).await
    }
}

/// Store whose every call fails as if the backend were down.
pub(crate) struct UnavailableStore;

impl DocumentStore for UnavailableStore {
    async fn get(&self, _key: &str) -> Result<Option<StoredDocument>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn put(
        &self,
        _key: &str,
        _body: &serde_json::Value,
        _condition: WriteCondition,
    ) -> Result<WriteReceipt, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

/// Store that answers every call only after `delay`.
pub(crate) struct SlowStore {
    inner: MemoryDocumentStore,
    delay: Duration,
}

impl SlowStore {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryDocumentStore::new(),
            delay,
        }
    }
}

impl DocumentStore for SlowStore {
    async fn get(&self, key: &str) -> Result<Option<StoredDocument>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(key).await
    }

    async fn put(
        &self,
        key: &str,
        body: &serde_json::Value,
        condition: WriteCondition,
    ) -> Result<WriteReceipt, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.put(key, body, condition).await
    }
}

/// Collaborator that replays a fixed script and records every request.
#[derive(Default)]
pub(crate) struct ScriptedCollaborator {
    replies: Mutex<VecDeque<Result<Completion, CollaboratorError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCollaborator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(self, text: &str, context: Option<&str>) -> Self {
        self.push(Ok(Completion {
            text: text.to_string(),
            context: context.map(str::to_string),
        }))
    }

    pub(crate) fn fail(self, error: CollaboratorError) -> Self {
        self.push(Err(error))
    }

    fn push(self, reply: Result<Completion, CollaboratorError>) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub(crate) fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl CompletionCollaborator for ScriptedCollaborator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, CollaboratorError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CollaboratorError::Request("script exhausted".into())))
    }
}
