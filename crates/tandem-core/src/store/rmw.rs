//! Optimistic read-modify-write.
//!
//! Every mutation of a conversation or session document goes through
//! [`read_modify_write`]: fetch the document and its concurrency token, apply
//! the caller's merge, write back conditioned on the token, and on a token
//! conflict start over from a fresh read. The merge closure may run more than
//! once, so it must derive its result only from the document it is handed.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tandem_types::config::StoreConfig;
use tandem_types::error::{CoreError, StoreError};
use tandem_types::store::WriteCondition;
use tracing::{debug, warn};

use super::document::DocumentStore;
use crate::deadline::within;

/// Upper bound for a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(1);

/// What the merge closure decided for this attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation<R> {
    /// The document was changed in place and must be written back.
    Write(R),
    /// Nothing changed; skip the write (idempotent replay, no-op read).
    Unchanged(R),
}

impl<R> Mutation<R> {
    pub fn map<U>(self, f: impl FnOnce(R) -> U) -> Mutation<U> {
        match self {
            Mutation::Write(r) => Mutation::Write(f(r)),
            Mutation::Unchanged(r) => Mutation::Unchanged(f(r)),
        }
    }
}

/// Result of a completed read-modify-write.
#[derive(Debug, Clone)]
pub struct RmwOutcome<T, R> {
    /// The document as committed (or as read, when unchanged).
    pub document: Option<T>,
    pub output: R,
    pub written: bool,
    pub attempts: u32,
    /// Sum of the store costs reported across every attempt.
    pub cost: f64,
}

fn backoff(policy: &StoreConfig, attempt: u32) -> Duration {
    let factor = 1u32 << attempt.saturating_sub(1).min(10);
    policy.retry_backoff().saturating_mul(factor).min(MAX_BACKOFF)
}

/// Run `mutate` against the document at `key` until a conditional write
/// succeeds, the closure returns [`Mutation::Unchanged`], or the attempt
/// budget in `policy` runs out.
///
/// Returns [`CoreError::ConcurrencyExceeded`] after `policy.max_attempts`
/// consecutive conflicts (a budget of zero is treated as one attempt). Each
/// store call is bounded by `policy.operation_timeout_ms`.
pub async fn read_modify_write<S, T, R, F>(
    store: &S,
    key: &str,
    policy: &StoreConfig,
    mut mutate: F,
) -> Result<RmwOutcome<T, R>, CoreError>
where
    S: DocumentStore,
    T: Serialize + DeserializeOwned,
    F: FnMut(&mut Option<T>) -> Result<Mutation<R>, CoreError>,
{
    let max_attempts = policy.max_attempts.max(1);
    let timeout = policy.operation_timeout();
    let mut cost = 0.0;

    for attempt in 1..=max_attempts {
        let fetched = within("store get", timeout, store.get(key)).await??;

        let (mut current, condition) = match fetched {
            Some(doc) => {
                cost += doc.cost;
                let value: T = serde_json::from_value(doc.body)
                    .map_err(|e| StoreError::Serialization(format!("{key}: {e}")))?;
                (Some(value), WriteCondition::IfMatch(doc.token))
            }
            None => (None, WriteCondition::IfAbsent),
        };

        let output = match mutate(&mut current)? {
            Mutation::Unchanged(output) => {
                return Ok(RmwOutcome {
                    document: current,
                    output,
                    written: false,
                    attempts: attempt,
                    cost,
                });
            }
            Mutation::Write(output) => output,
        };

        let Some(value) = current.as_ref() else {
            return Err(CoreError::invalid(format!(
                "merge for '{key}' requested a write without producing a document"
            )));
        };
        let body = serde_json::to_value(value)
            .map_err(|e| StoreError::Serialization(format!("{key}: {e}")))?;

        match within("store put", timeout, store.put(key, &body, condition)).await? {
            Ok(receipt) => {
                cost += receipt.cost;
                debug!(key, attempt, cost, "document committed");
                return Ok(RmwOutcome {
                    document: current,
                    output,
                    written: true,
                    attempts: attempt,
                    cost,
                });
            }
            Err(StoreError::Conflict(_)) => {
                debug!(key, attempt, max_attempts, "concurrency token conflict");
                if attempt < max_attempts {
                    tokio::time::sleep(backoff(policy, attempt)).await;
                }
            }
            Err(e) => return Err(e.into()),
        }
    }

    warn!(key, attempts = max_attempts, "write contention not resolved");
    Err(CoreError::ConcurrencyExceeded {
        key: key.to_string(),
        attempts: max_attempts,
    })
}
