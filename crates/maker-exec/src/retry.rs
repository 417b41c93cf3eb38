//! Bounded retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::ExecResult;

/// Run `op` up to `attempts` times, doubling `base_delay` after each
/// retryable failure. Non-retryable errors return immediately. With
/// `attempts == 0` the operation still runs once.
pub async fn with_retry<T, F, Fut>(attempts: u32, base_delay: Duration, mut op: F) -> ExecResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ExecResult<T>>,
{
    let mut delay = base_delay;
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                attempt += 1;
                if !e.is_retryable() || attempt >= attempts {
                    return Err(e);
                }
                debug!(attempt, error = %e, "Retrying request");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const FAST: Duration = Duration::from_millis(1);

    #[tokio::test]
    async fn test_first_try_success() {
        let calls = AtomicUsize::new(0);
        let result = with_retry(3, FAST, || async {
            calls.fetch_add(1, Ordering::Relaxed);
            Ok::<_, ExecError>(42)
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let calls = AtomicUsize::new(0);
        let result = with_retry(3, FAST, || async {
            let n = calls.fetch_add(1, Ordering::Relaxed);
            if n < 2 {
                Err(ExecError::Timeout)
            } else {
                Ok("acked")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "acked");
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn test_exhausts_attempts() {
        let calls = AtomicUsize::new(0);
        let result: ExecResult<()> = with_retry(3, FAST, || async {
            calls.fetch_add(1, Ordering::Relaxed);
            Err(ExecError::Transport("connection reset".to_string()))
        })
        .await;

        assert!(matches!(result, Err(ExecError::Transport(_))));
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn test_rejection_never_retried() {
        let calls = AtomicUsize::new(0);
        let result: ExecResult<()> = with_retry(3, FAST, || async {
            calls.fetch_add(1, Ordering::Relaxed);
            Err(ExecError::Rejected {
                status: 400,
                body: "bad order".to_string(),
            })
        })
        .await;

        assert!(matches!(result, Err(ExecError::Rejected { .. })));
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let calls = AtomicUsize::new(0);
        let result: ExecResult<()> = with_retry(0, FAST, || async {
            calls.fetch_add(1, Ordering::Relaxed);
            Err(ExecError::Timeout)
        })
        .await;

        assert!(matches!(result, Err(ExecError::Timeout)));
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }
}
