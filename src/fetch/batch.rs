//! Batch fetches
//!
//! A batch holds one coordinator slot and runs its sub-operations
//! sequentially inside it, reporting fractional progress after each one.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::fetch::{ProgressHandle, ProgressSender};

/// One deferred sub-operation of a batch.
pub type SubFetch<T> =
    Box<dyn FnOnce(CancellationToken) -> BoxFuture<'static, Result<T, FetchError>> + Send>;

/// Outcome of every sub-operation, keyed by sub-key.
pub type BatchResult<T> = HashMap<String, Result<T, FetchError>>;

/// Handle of a running batch; progress values are fractions in `(0, 1]`.
pub type BatchHandle<T> = ProgressHandle<BatchResult<T>, f64>;

/// Boxes a closure into a [`SubFetch`].
pub fn sub_fetch<T, F, Fut>(operation: F) -> SubFetch<T>
where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
{
    Box::new(move |cancel| operation(cancel).boxed())
}

/// Runs the sub-operations in order.
///
/// Once the batch's token is cancelled the remaining sub-operations are not
/// started and are recorded as [`FetchError::Cancelled`]; progress still
/// reaches 1.0. A panicking sub-operation is recorded as
/// [`FetchError::Aborted`] without taking the batch down.
pub(crate) async fn run_batch<T>(
    operations: Vec<(String, SubFetch<T>)>,
    progress: ProgressSender<f64>,
    cancel: CancellationToken,
) -> Result<BatchResult<T>, FetchError> {
    let total = operations.len();
    let mut results = HashMap::with_capacity(total);

    if total == 0 {
        progress.emit(1.0);
        return Ok(results);
    }

    for (index, (sub_key, operation)) in operations.into_iter().enumerate() {
        let outcome = if cancel.is_cancelled() {
            Err(FetchError::Cancelled)
        } else {
            AssertUnwindSafe(operation(cancel.child_token()))
                .catch_unwind()
                .await
                .unwrap_or(Err(FetchError::Aborted))
        };

        if let Err(e) = &outcome {
            debug!("Batch sub-fetch '{}' failed: {}", sub_key, e);
        }
        if results.insert(sub_key.clone(), outcome).is_some() {
            warn!("Duplicate batch sub-key '{}', earlier result replaced", sub_key);
        }

        progress.emit((index + 1) as f64 / total as f64);
    }

    Ok(results)
}
