use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable classification of a [`CoreError`].
///
/// This is what crosses the core boundary in structured results; callers
/// decide whether to retry or surface the failure based on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    ConcurrencyExceeded,
    StoreUnavailable,
    CollaboratorFailure,
    UnknownAgent,
    Timeout,
}

impl ErrorKind {
    /// Upper-case error code used by the HTTP envelope.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::ConcurrencyExceeded => "CONCURRENCY_EXCEEDED",
            ErrorKind::StoreUnavailable => "STORE_UNAVAILABLE",
            ErrorKind::CollaboratorFailure => "COLLABORATOR_FAILURE",
            ErrorKind::UnknownAgent => "UNKNOWN_AGENT",
            ErrorKind::Timeout => "TIMEOUT",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::NotFound => "not_found",
            ErrorKind::ConcurrencyExceeded => "concurrency_exceeded",
            ErrorKind::StoreUnavailable => "store_unavailable",
            ErrorKind::CollaboratorFailure => "collaborator_failure",
            ErrorKind::UnknownAgent => "unknown_agent",
            ErrorKind::Timeout => "timeout",
        };
        write!(f, "{s}")
    }
}

/// Errors returned by every operation of the conversation core.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("write contention on '{key}' not resolved after {attempts} attempts")]
    ConcurrencyExceeded { key: String, attempts: u32 },

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("collaborator failure: {0}")]
    CollaboratorFailure(String),

    #[error("unknown agent '{name}'; choose one of: {choices}")]
    UnknownAgent { name: String, choices: String },

    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },
}

impl CoreError {
    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::ConcurrencyExceeded { .. } => ErrorKind::ConcurrencyExceeded,
            CoreError::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
            CoreError::CollaboratorFailure(_) => ErrorKind::CollaboratorFailure,
            CoreError::UnknownAgent { .. } => ErrorKind::UnknownAgent,
            CoreError::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    /// Whether retrying the same (idempotent) call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::ConcurrencyExceeded { .. }
                | CoreError::StoreUnavailable(_)
                | CoreError::CollaboratorFailure(_)
                | CoreError::Timeout { .. }
        )
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        CoreError::InvalidArgument(message.into())
    }
}

/// Errors reported by a document store implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The concurrency token no longer matches (or the document already exists
    /// for an if-absent write).
    #[error("concurrency token mismatch for '{0}'")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("document serialization error: {0}")]
    Serialization(String),
}

impl From<StoreError> for CoreError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(key) => CoreError::ConcurrencyExceeded { key, attempts: 1 },
            StoreError::Unavailable(msg) => CoreError::StoreUnavailable(msg),
            StoreError::Serialization(msg) => {
                CoreError::StoreUnavailable(format!("unreadable document: {msg}"))
            }
        }
    }
}

/// Errors reported by a completion/classification collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    #[error("collaborator request failed: {0}")]
    Request(String),

    #[error("collaborator returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("no completion collaborator is configured")]
    NotConfigured,
}

impl From<CollaboratorError> for CoreError {
    fn from(e: CollaboratorError) -> Self {
        CoreError::CollaboratorFailure(e.to_string())
    }
}
