//! Fetch Coordinator
//!
//! Admission control for named asynchronous fetches: at most one running
//! fetch per key and at most `max_concurrent` running fetches overall.
//!
//! Cancellation here is bookkeeping. `cancel_fetch` frees the key's slot and
//! signals the fetch's `CancellationToken`, but the operation keeps running
//! until it checks the token itself. An operation that never looks at its
//! token runs to completion and still delivers its result.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::DEFAULT_MAX_CONCURRENT_FETCHES;
use crate::error::{AdmissionError, FetchError};
use crate::fetch::batch::{run_batch, BatchHandle, SubFetch};
use crate::fetch::{FetchHandle, ProgressHandle, ProgressSender};

#[derive(Debug)]
struct ActiveFetch {
    generation: u64,
    cancel: CancellationToken,
}

#[derive(Debug, Default)]
struct ActiveSet {
    fetches: HashMap<String, ActiveFetch>,
    next_generation: u64,
}

type SharedActiveSet = Arc<Mutex<ActiveSet>>;

fn lock_set(active: &SharedActiveSet) -> MutexGuard<'_, ActiveSet> {
    active.lock().unwrap_or_else(|e| e.into_inner())
}

// == Slot ==
/// Ownership of one concurrency slot; releases it on drop.
///
/// Release only removes the key if it still belongs to this generation, so a
/// fetch that was cancelled and superseded never frees its successor's slot.
struct Slot {
    active: SharedActiveSet,
    key: String,
    generation: u64,
    cancel: CancellationToken,
}

impl Drop for Slot {
    fn drop(&mut self) {
        let mut set = lock_set(&self.active);
        if set
            .fetches
            .get(&self.key)
            .is_some_and(|f| f.generation == self.generation)
        {
            set.fetches.remove(&self.key);
            debug!("Fetch slot released: {}", self.key);
        }
    }
}

// == Fetch Coordinator ==
/// Bounded, dedup-guarded launcher for fetch operations.
///
/// Cheap to clone; clones share the same active set.
#[derive(Debug, Clone)]
pub struct FetchCoordinator {
    active: SharedActiveSet,
    max_concurrent: usize,
}

impl Default for FetchCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT_FETCHES)
    }
}

impl FetchCoordinator {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            active: Arc::new(Mutex::new(ActiveSet::default())),
            max_concurrent,
        }
    }

    // == Admission ==
    /// Membership test, capacity test and insert in one critical section.
    fn admit(&self, key: &str) -> Result<Slot, AdmissionError> {
        let mut set = lock_set(&self.active);

        if set.fetches.contains_key(key) {
            debug!("Fetch rejected, already active: {}", key);
            return Err(AdmissionError::AlreadyActive(key.to_string()));
        }
        if set.fetches.len() >= self.max_concurrent {
            debug!(
                "Fetch rejected, {} of {} slots in use: {}",
                set.fetches.len(),
                self.max_concurrent,
                key
            );
            return Err(AdmissionError::MaxConcurrentReached {
                limit: self.max_concurrent,
            });
        }

        let generation = set.next_generation;
        set.next_generation += 1;
        let cancel = CancellationToken::new();
        set.fetches.insert(
            key.to_string(),
            ActiveFetch {
                generation,
                cancel: cancel.clone(),
            },
        );
        debug!("Fetch admitted: {} ({} active)", key, set.fetches.len());

        Ok(Slot {
            active: self.active.clone(),
            key: key.to_string(),
            generation,
            cancel,
        })
    }

    // == Start Fetch ==
    /// Admits `key` and runs `operation` on its own tokio task.
    ///
    /// The operation receives the fetch's cancellation token. Its result is
    /// delivered once through the returned handle after the slot has been
    /// released. Must be called from within a tokio runtime.
    pub fn start_fetch<T, F, Fut>(
        &self,
        key: impl Into<String>,
        operation: F,
    ) -> Result<FetchHandle<T>, AdmissionError>
    where
        T: Send + 'static,
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let key = key.into();
        let slot = self.admit(&key)?;
        let (sender, receiver) = oneshot::channel();

        tokio::spawn(async move {
            let result = operation(slot.cancel.clone()).await;
            drop(slot);
            // The caller may have dropped its handle; the result is then discarded.
            let _ = sender.send(result);
        });

        Ok(FetchHandle::new(key, receiver))
    }

    // == Start Progressive Fetch ==
    /// Like [`start_fetch`](Self::start_fetch), but the operation also gets a
    /// [`ProgressSender`] whose values reach the handle in emission order.
    pub fn start_progressive_fetch<T, P, F, Fut>(
        &self,
        key: impl Into<String>,
        operation: F,
    ) -> Result<ProgressHandle<T, P>, AdmissionError>
    where
        T: Send + 'static,
        P: Send + 'static,
        F: FnOnce(ProgressSender<P>, CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let handle = self.start_fetch(key, move |cancel| {
            operation(ProgressSender::new(progress_tx), cancel)
        })?;
        Ok(ProgressHandle::new(progress_rx, handle))
    }

    // == Start Batch Fetch ==
    /// Runs `operations` one after another inside the single slot of `batch_key`.
    ///
    /// Progress is `completed / total` after each sub-operation. The result
    /// maps every sub-key to its own outcome; a failing sub-operation never
    /// stops the batch. Sub-keys are not admission-checked and should be unique.
    pub fn start_batch_fetch<T>(
        &self,
        batch_key: impl Into<String>,
        operations: Vec<(String, SubFetch<T>)>,
    ) -> Result<BatchHandle<T>, AdmissionError>
    where
        T: Send + 'static,
    {
        self.start_progressive_fetch(batch_key, move |progress, cancel| {
            run_batch(operations, progress, cancel)
        })
    }

    // == Cancel Fetch ==
    /// Frees `key`'s slot and signals its token. Returns whether it was active.
    ///
    /// Does not interrupt the operation; see the module documentation.
    pub fn cancel_fetch(&self, key: &str) -> bool {
        let removed = lock_set(&self.active).fetches.remove(key);
        match removed {
            Some(fetch) => {
                fetch.cancel.cancel();
                info!("Fetch cancelled: {}", key);
                true
            }
            None => false,
        }
    }

    // == Cancel All ==
    /// Frees every slot and signals every token. Returns how many were active.
    pub fn cancel_all_fetches(&self) -> usize {
        let drained: Vec<_> = lock_set(&self.active).fetches.drain().collect();
        for (_, fetch) in &drained {
            fetch.cancel.cancel();
        }
        if !drained.is_empty() {
            info!("Cancelled {} active fetches", drained.len());
        }
        drained.len()
    }

    // == Status ==
    pub fn active_count(&self) -> usize {
        lock_set(&self.active).fetches.len()
    }

    pub fn is_active(&self, key: &str) -> bool {
        lock_set(&self.active).fetches.contains_key(key)
    }

    /// Sorted snapshot of the active keys.
    pub fn active_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = lock_set(&self.active).fetches.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}
