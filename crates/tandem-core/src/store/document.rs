//! DocumentStore trait definition.
//!
//! The conversation core treats persistence as an external key-value
//! document store: get-by-key, conditional put with a concurrency token, and
//! a per-operation cost figure. Implementations live in `tandem-infra`
//! (SQLite) and in [`super::memory`] (in-process).

use tandem_types::error::StoreError;
use tandem_types::store::{StoredDocument, WriteCondition, WriteReceipt};

/// Key-addressed JSON document store with optimistic concurrency.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait DocumentStore: Send + Sync {
    /// Fetch a document. A miss is `Ok(None)`, not an error.
    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<StoredDocument>, StoreError>> + Send;

    /// Write a document if `condition` holds.
    ///
    /// Returns `StoreError::Conflict` when the condition fails (token changed,
    /// or the key already exists for an if-absent write).
    fn put(
        &self,
        key: &str,
        body: &serde_json::Value,
        condition: WriteCondition,
    ) -> impl std::future::Future<Output = Result<WriteReceipt, StoreError>> + Send;
}
