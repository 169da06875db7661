//! SQLite document store.
//!
//! Implements `DocumentStore` from `tandem-core` on the `documents` table.
//! The concurrency token is the row's `version` column: if-absent writes use
//! `INSERT .. ON CONFLICT DO NOTHING`, if-match writes use
//! `UPDATE .. WHERE version = ?`, and zero affected rows is a conflict.

use chrono::Utc;
use sqlx::Row;
use tandem_core::store::DocumentStore;
use tandem_types::error::StoreError;
use tandem_types::store::{ConcurrencyToken, StoredDocument, WriteCondition, WriteReceipt};
use tracing::debug;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `DocumentStore`.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: DatabasePool,
}

impl SqliteDocumentStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Body size in KiB, rounded up, never less than one unit.
fn cost_of(body_len: usize) -> f64 {
    body_len.div_ceil(1024).max(1) as f64
}

fn unavailable(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn token(version: i64) -> ConcurrencyToken {
    ConcurrencyToken(version.to_string())
}

// ---------------------------------------------------------------------------
// DocumentStore implementation
// ---------------------------------------------------------------------------

impl DocumentStore for SqliteDocumentStore {
    async fn get(&self, key: &str) -> Result<Option<StoredDocument>, StoreError> {
        let row = sqlx::query("SELECT body, version FROM documents WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(unavailable)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let body: String = row.try_get("body").map_err(unavailable)?;
        let version: i64 = row.try_get("version").map_err(unavailable)?;
        let value = serde_json::from_str(&body)
            .map_err(|e| StoreError::Serialization(format!("{key}: {e}")))?;

        Ok(Some(StoredDocument {
            key: key.to_string(),
            body: value,
            token: token(version),
            cost: cost_of(body.len()),
        }))
    }

    async fn put(
        &self,
        key: &str,
        body: &serde_json::Value,
        condition: WriteCondition,
    ) -> Result<WriteReceipt, StoreError> {
        let text = serde_json::to_string(body)
            .map_err(|e| StoreError::Serialization(format!("{key}: {e}")))?;
        let now = Utc::now().to_rfc3339();

        let version = match condition {
            WriteCondition::IfAbsent => {
                let result = sqlx::query(
                    "INSERT INTO documents (key, body, version, updated_at) VALUES (?, ?, 1, ?) \
                     ON CONFLICT(key) DO NOTHING",
                )
                .bind(key)
                .bind(&text)
                .bind(&now)
                .execute(&self.pool.writer)
                .await
                .map_err(unavailable)?;

                if result.rows_affected() == 0 {
                    return Err(StoreError::Conflict(key.to_string()));
                }
                1
            }
            WriteCondition::IfMatch(expected) => {
                let Ok(expected) = expected.0.parse::<i64>() else {
                    return Err(StoreError::Conflict(key.to_string()));
                };
                let result = sqlx::query(
                    "UPDATE documents SET body = ?, version = version + 1, updated_at = ? \
                     WHERE key = ? AND version = ?",
                )
                .bind(&text)
                .bind(&now)
                .bind(key)
                .bind(expected)
                .execute(&self.pool.writer)
                .await
                .map_err(unavailable)?;

                if result.rows_affected() == 0 {
                    return Err(StoreError::Conflict(key.to_string()));
                }
                expected + 1
            }
        };

        debug!(key, version, bytes = text.len(), "document written");
        Ok(WriteReceipt {
            token: token(version),
            cost: cost_of(text.len()),
        })
    }
}
