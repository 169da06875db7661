//! Document-store contract types.
//!
//! The store is an external collaborator addressed by string keys. Writes are
//! conditional on a concurrency token, and every operation reports a
//! consumable cost used only for observability.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque version marker returned by the store with every read and write.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConcurrencyToken(pub String);

impl fmt::Display for ConcurrencyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A document as fetched from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub key: String,
    pub body: serde_json::Value,
    pub token: ConcurrencyToken,
    pub cost: f64,
}

/// Precondition attached to a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCondition {
    /// Create only; fails with a conflict if the key exists.
    IfAbsent,
    /// Replace only if the stored token still matches.
    IfMatch(ConcurrencyToken),
}

/// Acknowledgement of a committed write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteReceipt {
    pub token: ConcurrencyToken,
    pub cost: f64,
}
