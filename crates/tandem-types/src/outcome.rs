//! Structured operation results returned across the core boundary.
//!
//! Failures are never thrown across the boundary: every surface renders an
//! [`OperationResult`] with `success`, the payload, and a tagged error so the
//! caller can decide between retrying and surfacing the failure.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, ErrorKind};

/// Tagged error detail embedded in a failed [`OperationResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl From<&CoreError> for ErrorDetail {
    fn from(e: &CoreError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
            retryable: e.is_retryable(),
        }
    }
}

/// Result envelope: `success=false` carries an [`ErrorDetail`] instead of data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl<T> OperationResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: &CoreError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorDetail::from(error)),
        }
    }
}

impl<T> From<Result<T, CoreError>> for OperationResult<T> {
    fn from(result: Result<T, CoreError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::failure(&e),
        }
    }
}
