//! Completion and progress channels handed back by the coordinator

use tokio::sync::{mpsc, oneshot};

use crate::error::FetchError;

// == Fetch Handle ==
/// Receives the single completion of an admitted fetch.
///
/// The worker sends exactly one result. If the worker dies without sending
/// (panic, runtime shutdown) `join` reports [`FetchError::Aborted`].
#[derive(Debug)]
pub struct FetchHandle<T> {
    key: String,
    receiver: oneshot::Receiver<Result<T, FetchError>>,
}

impl<T> FetchHandle<T> {
    pub(crate) fn new(key: String, receiver: oneshot::Receiver<Result<T, FetchError>>) -> Self {
        Self { key, receiver }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Waits for the fetch to finish.
    pub async fn join(self) -> Result<T, FetchError> {
        self.receiver.await.unwrap_or(Err(FetchError::Aborted))
    }
}

// == Progress Sender ==
/// Progress-emission capability given to a progressive operation.
#[derive(Debug)]
pub struct ProgressSender<P> {
    sender: mpsc::UnboundedSender<P>,
}

impl<P> Clone for ProgressSender<P> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<P> ProgressSender<P> {
    pub(crate) fn new(sender: mpsc::UnboundedSender<P>) -> Self {
        Self { sender }
    }

    /// Forwards one progress value. Returns `false` once the caller stopped listening.
    pub fn emit(&self, value: P) -> bool {
        self.sender.send(value).is_ok()
    }
}

// == Progress Handle ==
/// Progress stream plus completion of a progressive fetch.
///
/// Progress values arrive in emission order; the stream ends when the
/// operation finishes.
#[derive(Debug)]
pub struct ProgressHandle<T, P> {
    progress: mpsc::UnboundedReceiver<P>,
    result: FetchHandle<T>,
}

impl<T, P> ProgressHandle<T, P> {
    pub(crate) fn new(progress: mpsc::UnboundedReceiver<P>, result: FetchHandle<T>) -> Self {
        Self { progress, result }
    }

    pub fn key(&self) -> &str {
        self.result.key()
    }

    /// Next progress value, `None` once the operation has finished emitting.
    pub async fn next_progress(&mut self) -> Option<P> {
        self.progress.recv().await
    }

    /// Waits for completion, discarding any progress not yet read.
    pub async fn join(self) -> Result<T, FetchError> {
        self.result.join().await
    }

    /// Drains the whole progress stream, then waits for completion.
    pub async fn collect(mut self) -> (Vec<P>, Result<T, FetchError>) {
        let mut seen = Vec::new();
        while let Some(value) = self.progress.recv().await {
            seen.push(value);
        }
        (seen, self.result.join().await)
    }
}
