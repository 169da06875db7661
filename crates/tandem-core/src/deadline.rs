//! Caller-supplied deadlines for store and collaborator calls.

use std::future::Future;
use std::time::Duration;

use tandem_types::error::CoreError;
use tracing::warn;

/// Await `fut`, failing with [`CoreError::Timeout`] once `limit` elapses.
///
/// Everything guarded by this helper is idempotent, so a timed-out call is
/// safe to retry.
pub async fn within<F: Future>(
    operation: &str,
    limit: Duration,
    fut: F,
) -> Result<F::Output, CoreError> {
    match tokio::time::timeout(limit, fut).await {
        Ok(output) => Ok(output),
        Err(_) => {
            warn!(operation, ?limit, "operation timed out");
            Err(CoreError::Timeout {
                operation: operation.to_string(),
                after: limit,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_within_limit() {
        let value = within("noop", Duration::from_secs(1), async { 7 })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn times_out() {
        let result = within("slow store get", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
        })
        .await;
        assert!(matches!(
            result,
            Err(CoreError::Timeout { ref operation, .. }) if operation == "slow store get"
        ));
    }
}
