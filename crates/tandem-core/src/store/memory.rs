//! In-process document store.
//!
//! Backs `--ephemeral` runs and tests. Tokens are per-key version counters;
//! conditional writes are checked and applied under the map's shard lock, so
//! no lock is held across an await point.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tandem_types::error::StoreError;
use tandem_types::store::{ConcurrencyToken, StoredDocument, WriteCondition, WriteReceipt};

use super::document::DocumentStore;

/// Flat cost reported for every in-memory read or write.
const OPERATION_COST: f64 = 1.0;

#[derive(Debug, Clone)]
struct Slot {
    body: serde_json::Value,
    version: u64,
}

/// `DashMap`-backed implementation of [`DocumentStore`]. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    documents: Arc<DashMap<String, Slot>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn token(version: u64) -> ConcurrencyToken {
    ConcurrencyToken(version.to_string())
}

impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, key: &str) -> Result<Option<StoredDocument>, StoreError> {
        Ok(self.documents.get(key).map(|slot| StoredDocument {
            key: key.to_string(),
            body: slot.body.clone(),
            token: token(slot.version),
            cost: OPERATION_COST,
        }))
    }

    async fn put(
        &self,
        key: &str,
        body: &serde_json::Value,
        condition: WriteCondition,
    ) -> Result<WriteReceipt, StoreError> {
        let version = match (self.documents.entry(key.to_string()), condition) {
            (Entry::Vacant(vacant), WriteCondition::IfAbsent) => {
                vacant.insert(Slot {
                    body: body.clone(),
                    version: 1,
                });
                1
            }
            (Entry::Occupied(mut occupied), WriteCondition::IfMatch(expected)) => {
                let slot = occupied.get_mut();
                if token(slot.version) != expected {
                    return Err(StoreError::Conflict(key.to_string()));
                }
                slot.version += 1;
                slot.body = body.clone();
                slot.version
            }
            _ => return Err(StoreError::Conflict(key.to_string())),
        };

        Ok(WriteReceipt {
            token: token(version),
            cost: OPERATION_COST,
        })
    }
}
