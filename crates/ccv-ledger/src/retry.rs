//! Retry with exponential backoff for ledger calls.
//!
//! Only transient errors (unavailable, timeout) are retried. Rejections and
//! signature failures are returned at once.

use std::future::Future;

use crate::config::LedgerConfig;
use crate::error::LedgerError;

/// Call `f` up to `max_retries + 1` times while it fails transiently.
///
/// Returns the last result together with the number of attempts made.
pub(crate) async fn retry_transient<T, F, Fut>(
    config: &LedgerConfig,
    operation: &str,
    f: F,
) -> (Result<T, LedgerError>, u32)
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, LedgerError>>,
{
    for attempt in 0..config.max_retries {
        match f().await {
            Ok(value) => return (Ok(value), attempt + 1),
            Err(e) if e.is_transient() => {
                let delay = config.retry_delay(attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    max_retries = config.max_retries,
                    "ledger {operation} failed, retrying in {delay:?}: {e}"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return (Err(e), attempt + 1),
        }
    }
    // Final attempt.
    (f().await, config.max_retries + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn exhausts_all_attempts_on_transient_failure() {
        let calls = Arc::new(AtomicU32::new(0));
        let config = LedgerConfig::fast();

        let (result, attempts) = retry_transient(&config, "submit", || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(LedgerError::Timeout { elapsed_ms: 5 })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts, config.max_retries + 1);
        assert_eq!(calls.load(Ordering::SeqCst), config.max_retries + 1);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let (result, attempts) = retry_transient(&LedgerConfig::fast(), "submit", || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(LedgerError::Rejected {
                    adapter: "test".into(),
                    reason: "no".into(),
                })
            }
        })
        .await;
        assert!(matches!(result, Err(LedgerError::Rejected { .. })));
        assert_eq!(attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let (result, attempts) = retry_transient(&LedgerConfig::fast(), "submit", || {
            let calls = calls.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(LedgerError::Unavailable {
                        reason: "down".into(),
                    })
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts, 3);
    }
}
