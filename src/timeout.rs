//! Deadline guard
//!
//! Races an operation against a timer. When the timer wins the operation's
//! future is dropped, which cancels it at its next suspension point; any
//! work it had already handed to other tasks is abandoned and its result
//! discarded.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::TimeoutError;

/// Runs `operation` with a deadline of `duration`.
///
/// Returns the operation's own result if it finishes first, otherwise a
/// [`TimeoutError`] converted into the operation's error type.
pub async fn with_deadline<T, E, F>(duration: Duration, operation: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<TimeoutError>,
{
    match tokio::time::timeout(duration, operation).await {
        Ok(result) => result,
        Err(_) => {
            warn!("Operation exceeded its {:?} deadline", duration);
            Err(TimeoutError { after: duration }.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_fast_operation_returns_its_value() {
        let result: Result<u32, FetchError> =
            with_deadline(Duration::from_secs(1), async { Ok(42) }).await;

        assert_eq!(result, Ok(42));
    }

    #[tokio::test]
    async fn test_fast_operation_returns_its_error() {
        let result: Result<u32, FetchError> = with_deadline(Duration::from_secs(1), async {
            Err(FetchError::Parse("bad body".to_string()))
        })
        .await;

        assert_eq!(result, Err(FetchError::Parse("bad body".to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_operation_times_out_and_is_dropped() {
        let completed = Arc::new(AtomicBool::new(false));
        let flag = completed.clone();

        let result: Result<u32, FetchError> = with_deadline(Duration::from_millis(50), async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            flag.store(true, Ordering::SeqCst);
            Ok(1)
        })
        .await;

        assert_eq!(
            result,
            Err(FetchError::Timeout(TimeoutError {
                after: Duration::from_millis(50)
            }))
        );

        // The raced future was dropped; it never gets to finish
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(!completed.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_work_is_abandoned_with_result_discarded() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let worker = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            let _ = tx.send(7u32);
        });

        let result: Result<u32, FetchError> = with_deadline(Duration::from_secs(1), async move {
            rx.await.map_err(|_| FetchError::Aborted)
        })
        .await;
        assert!(matches!(result, Err(FetchError::Timeout(_))));

        // The detached worker runs to completion but nobody receives its value
        worker.await.unwrap();
    }
}
