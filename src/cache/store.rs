//! Content Cache Module
//!
//! Durable key -> episode-list storage with TTL expiration and a size ceiling.
//! Each `ContentCache` owns one namespace (one backend); reads share a lock,
//! writes and the cleanup that follows them hold it exclusively.

use std::marker::PhantomData;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::{CacheBackend, CacheEntry, CacheStats, FileBackend, MemoryBackend};
use crate::error::PersistenceError;

// == Content Cache ==
/// Namespaced, expiring, size-bounded cache of item lists.
pub struct ContentCache<T> {
    backend: Arc<dyn CacheBackend>,
    /// Entries older than this are dropped on their next read
    ttl: Duration,
    /// Aggregate size ceiling enforced after every write
    max_bytes: u64,
    namespace_lock: RwLock<()>,
    stats: Mutex<CacheStats>,
    _items: PhantomData<fn() -> T>,
}

impl<T> ContentCache<T>
where
    T: Serialize + DeserializeOwned,
{
    // == Constructors ==
    /// Creates a cache over an explicit backend.
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration, max_bytes: u64) -> Self {
        Self {
            backend,
            ttl,
            max_bytes,
            namespace_lock: RwLock::new(()),
            stats: Mutex::new(CacheStats::new()),
            _items: PhantomData,
        }
    }

    /// Creates a file-backed cache stored under `root/namespace`.
    pub fn open(root: impl AsRef<Path>, namespace: &str, ttl: Duration, max_bytes: u64) -> Self {
        let dir = root.as_ref().join(namespace);
        Self::new(Arc::new(FileBackend::new(dir)), ttl, max_bytes)
    }

    /// Creates a cache that lives only in memory.
    pub fn in_memory(ttl: Duration, max_bytes: u64) -> Self {
        Self::new(Arc::new(MemoryBackend::new()), ttl, max_bytes)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    // == Store ==
    /// Replaces the entry for `key` and enforces the size ceiling.
    ///
    /// Persistence failures are logged and counted, never returned. When this
    /// returns, the namespace is already back under its ceiling.
    pub async fn store(&self, key: &str, items: Vec<T>) {
        let count = items.len();
        let entry = CacheEntry::new(items);

        let _guard = self.namespace_lock.write().await;

        if let Err(e) = self.write_entry(key, &entry).await {
            warn!("Cache store failed: {}", e);
            self.counters().record_write_failure();
            return;
        }
        debug!("Cached {} items under '{}'", count, key);

        self.enforce_size_limit().await;
    }

    // == Fetch ==
    /// Returns the cached items for `key`.
    ///
    /// Absent, expired and unreadable entries all yield `None`. An expired
    /// entry is deleted as part of the read that discovers it.
    pub async fn fetch(&self, key: &str) -> Option<Vec<T>> {
        {
            let _guard = self.namespace_lock.read().await;
            match self.read_entry(key).await {
                Ok(Some(entry)) if !entry.is_expired(self.ttl) => {
                    self.counters().record_hit();
                    return Some(entry.items);
                }
                Ok(Some(_)) => {}
                Ok(None) => {
                    self.counters().record_miss();
                    return None;
                }
                Err(e) => {
                    warn!("Cache read treated as miss: {}", e);
                    self.counters().record_miss();
                    return None;
                }
            }
        }

        // Expired: re-check under the write lock, a store may have landed in between.
        let _guard = self.namespace_lock.write().await;
        let result = match self.read_entry(key).await {
            Ok(Some(entry)) if !entry.is_expired(self.ttl) => Some(entry.items),
            Ok(Some(_)) => {
                match self.backend.remove(key).await {
                    Ok(_) => {
                        debug!("Removed expired cache entry '{}'", key);
                        self.counters().record_expiration();
                    }
                    Err(e) => warn!("Failed to remove expired entry '{}': {}", key, e),
                }
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Cache read treated as miss: {}", e);
                None
            }
        };

        match result {
            Some(_) => self.counters().record_hit(),
            None => self.counters().record_miss(),
        }
        result
    }

    // == Clear ==
    /// Deletes the entry for `key`. Absent keys are not an error.
    pub async fn clear(&self, key: &str) {
        let _guard = self.namespace_lock.write().await;
        match self.backend.remove(key).await {
            Ok(true) => debug!("Cleared cache entry '{}'", key),
            Ok(false) => {}
            Err(e) => warn!("Failed to clear cache entry '{}': {}", key, e),
        }
    }

    // == Clear All ==
    /// Deletes every entry of the namespace.
    pub async fn clear_all(&self) {
        let _guard = self.namespace_lock.write().await;
        match self.backend.remove_all().await {
            Ok(removed) => info!("Cleared {} cache entries", removed),
            Err(e) => warn!("Failed to clear cache: {}", e),
        }
    }

    // == Statistics ==
    /// Returns counters plus the namespace's current entry count and size.
    pub async fn snapshot(&self) -> CacheStats {
        let footprint = {
            let _guard = self.namespace_lock.read().await;
            self.backend.list().await
        };

        let mut stats = self.counters().clone();
        match footprint {
            Ok(entries) => {
                let bytes = entries.iter().map(|e| e.size.unwrap_or(0)).sum();
                stats.set_footprint(entries.len(), bytes);
            }
            Err(e) => warn!("Failed to enumerate cache entries: {}", e),
        }
        stats
    }

    // == Cleanup ==
    /// Evicts oldest-written entries once the namespace exceeds its ceiling,
    /// down to half the ceiling. Caller must hold the write lock.
    ///
    /// Entries whose size is unknown count as zero bytes, so they never push
    /// the total over the ceiling, yet they are evicted like any other entry
    /// once eviction starts. This asymmetry is kept as-is.
    async fn enforce_size_limit(&self) -> usize {
        let mut entries = match self.backend.list().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Skipping cache cleanup, enumeration failed: {}", e);
                return 0;
            }
        };

        let mut total: u64 = entries.iter().map(|e| e.size.unwrap_or(0)).sum();
        if total <= self.max_bytes {
            return 0;
        }

        let target = self.max_bytes / 2;
        let before = total;
        entries.sort_by_key(|e| e.modified);

        let mut evicted = 0;
        for entry in entries {
            if total <= target {
                break;
            }
            match self.backend.remove(&entry.key).await {
                Ok(_) => {
                    total = total.saturating_sub(entry.size.unwrap_or(0));
                    evicted += 1;
                }
                Err(e) => warn!("Failed to evict cache entry '{}': {}", entry.key, e),
            }
        }

        info!(
            "Cache cleanup: evicted {} entries, {} -> {} bytes (limit {})",
            evicted, before, total, self.max_bytes
        );
        self.counters().record_evictions(evicted);
        evicted
    }

    async fn write_entry(
        &self,
        key: &str,
        entry: &CacheEntry<T>,
    ) -> Result<(), PersistenceError> {
        let write = match serde_json::to_vec(entry) {
            Ok(bytes) => self.backend.write_atomic(key, &bytes).await,
            Err(e) => Err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
        };
        write.map_err(|source| PersistenceError::WriteFailure {
            key: key.to_string(),
            source,
        })
    }

    async fn read_entry(&self, key: &str) -> Result<Option<CacheEntry<T>>, PersistenceError> {
        let bytes = self
            .backend
            .read(key)
            .await
            .map_err(|source| PersistenceError::ReadFailure {
                key: key.to_string(),
                source,
            })?;

        bytes
            .map(|bytes| {
                serde_json::from_slice(&bytes).map_err(|source| PersistenceError::DecodeFailure {
                    key: key.to_string(),
                    source,
                })
            })
            .transpose()
    }

    fn counters(&self) -> MutexGuard<'_, CacheStats> {
        self.stats.lock().unwrap_or_else(|e| e.into_inner())
    }
}
