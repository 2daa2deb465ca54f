//! Storage backends for the content cache
//!
//! A backend is a flat byte-oriented key/value store that can replace a value
//! atomically and enumerate its entries with size and modification time.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Size and age information for one stored entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMetadata {
    pub key: String,
    /// `None` when the size could not be determined
    pub size: Option<u64>,
    /// Last write time
    pub modified: SystemTime,
}

/// Trait for cache storage backends
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Replace the value stored under `key`. Readers see either the old or
    /// the new bytes, never a partial write.
    async fn write_atomic(&self, key: &str, bytes: &[u8]) -> io::Result<()>;

    /// Read the value stored under `key`, `None` if absent
    async fn read(&self, key: &str) -> io::Result<Option<Vec<u8>>>;

    /// Delete `key`, returning whether something was removed
    async fn remove(&self, key: &str) -> io::Result<bool>;

    /// Enumerate all entries with their metadata
    async fn list(&self) -> io::Result<Vec<EntryMetadata>>;

    /// Delete every entry, returning how many were removed
    async fn remove_all(&self) -> io::Result<usize>;
}

// == File Backend ==

const ENTRY_EXTENSION: &str = "json";
const KEY_EXTENSION: &str = "key";
const TEMP_EXTENSION: &str = "tmp";

/// Longest encoded key used verbatim as a file stem
pub const MAX_ENCODED_STEM: usize = 200;

/// Marks hashed stems; `encode_key` always escapes this character
const HASHED_PREFIX: char = '~';

/// One file per key inside a single directory.
///
/// Keys whose encoding is empty or longer than [`MAX_ENCODED_STEM`] are
/// stored under a SHA-256 stem, with the original key kept in a `.key`
/// sidecar so `list` can still report it.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", stem, ENTRY_EXTENSION))
    }

    fn sidecar_path(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", stem, KEY_EXTENSION))
    }

    async fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir).await
    }

    /// Recovers the key of an entry file from its stem.
    async fn key_for_stem(&self, stem: &str) -> Option<String> {
        if !is_hashed_stem(stem) {
            return decode_key(stem);
        }
        match fs::read_to_string(self.sidecar_path(stem)).await {
            Ok(key) => Some(key),
            Err(e) => {
                warn!("Cache entry {} has no readable key file: {}", stem, e);
                None
            }
        }
    }

    /// Deletes leftovers of interrupted writes. Returns how many were removed.
    async fn sweep_temp_files(&self) -> io::Result<usize> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut swept = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some(TEMP_EXTENSION) {
                remove_if_present(&path).await?;
                swept += 1;
            }
        }
        if swept > 0 {
            debug!("Swept {} stray temp files from {:?}", swept, self.dir);
        }
        Ok(swept)
    }
}

#[async_trait]
impl CacheBackend for FileBackend {
    async fn write_atomic(&self, key: &str, bytes: &[u8]) -> io::Result<()> {
        self.ensure_dir().await?;

        let stem = entry_stem(key);
        if is_hashed_stem(&stem) {
            // Sidecar first, so a listed entry always has its key
            write_file_atomic(&self.sidecar_path(&stem), key.as_bytes()).await?;
        }
        write_file_atomic(&self.entry_path(&stem), bytes).await
    }

    async fn read(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.entry_path(&entry_stem(key))).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn remove(&self, key: &str) -> io::Result<bool> {
        let stem = entry_stem(key);
        let removed = remove_if_present(&self.entry_path(&stem)).await?;
        if is_hashed_stem(&stem) {
            remove_if_present(&self.sidecar_path(&stem)).await?;
        }
        Ok(removed)
    }

    async fn list(&self) -> io::Result<Vec<EntryMetadata>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut listed = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Some(key) = self.key_for_stem(stem).await else {
                continue;
            };

            let (size, modified) = match entry.metadata().await {
                Ok(meta) => (Some(meta.len()), meta.modified().unwrap_or(UNIX_EPOCH)),
                Err(e) => {
                    warn!("Failed to read metadata of cache entry {:?}: {}", path, e);
                    (None, UNIX_EPOCH)
                }
            };

            listed.push(EntryMetadata {
                key,
                size,
                modified,
            });
        }

        Ok(listed)
    }

    async fn remove_all(&self) -> io::Result<usize> {
        let mut removed = 0;
        for entry in self.list().await? {
            if self.remove(&entry.key).await? {
                removed += 1;
            }
        }
        self.sweep_temp_files().await?;
        Ok(removed)
    }
}

/// File stem for `key`: its encoding when short enough, a digest otherwise.
fn entry_stem(key: &str) -> String {
    let encoded = encode_key(key);
    if !encoded.is_empty() && encoded.len() <= MAX_ENCODED_STEM {
        return encoded;
    }
    let digest = Sha256::digest(key.as_bytes());
    format!("{}{}", HASHED_PREFIX, hex::encode(digest))
}

fn is_hashed_stem(stem: &str) -> bool {
    stem.starts_with(HASHED_PREFIX)
}

/// Temp file next to `path`, e.g. `feed.json` -> `feed.json.tmp`.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(TEMP_EXTENSION);
    PathBuf::from(name)
}

/// Writes through a temp file, then renames over `path`.
///
/// The temp file is removed again if any step fails.
async fn write_file_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let temp = temp_path(path);
    let result: io::Result<()> = async {
        let mut file = fs::File::create(&temp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp, path).await
    }
    .await;

    if result.is_err() {
        if let Err(e) = remove_if_present(&temp).await {
            warn!("Failed to remove temp file {:?}: {}", temp, e);
        }
    }
    result
}

async fn remove_if_present(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Maps an arbitrary key onto a file-name-safe stem.
///
/// ASCII alphanumerics, `-` and `_` pass through; every other byte becomes `%XX`.
pub fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

/// Inverse of [`encode_key`]. Returns `None` for stems it did not produce.
pub fn decode_key(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = stem.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

// == Memory Backend ==

#[derive(Debug)]
struct MemoryRecord {
    bytes: Vec<u8>,
    modified: SystemTime,
    size_known: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    records: HashMap<String, MemoryRecord>,
    last_modified: Option<SystemTime>,
}

/// In-process backend, used by tests and for caches that need no durability.
///
/// Modification times are strictly increasing across writes so that
/// write order is always recoverable from `list`.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Makes `list` report an unknown size for `key`.
    #[cfg(test)]
    pub(crate) fn forget_size(&self, key: &str) {
        if let Some(record) = self.lock().records.get_mut(key) {
            record.size_known = false;
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn write_atomic(&self, key: &str, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.lock();
        let mut modified = SystemTime::now();
        if let Some(last) = state.last_modified {
            if modified <= last {
                modified = last + Duration::from_micros(1);
            }
        }
        state.last_modified = Some(modified);
        state.records.insert(
            key.to_string(),
            MemoryRecord {
                bytes: bytes.to_vec(),
                modified,
                size_known: true,
            },
        );
        Ok(())
    }

    async fn read(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self.lock().records.get(key).map(|r| r.bytes.clone()))
    }

    async fn remove(&self, key: &str) -> io::Result<bool> {
        Ok(self.lock().records.remove(key).is_some())
    }

    async fn list(&self) -> io::Result<Vec<EntryMetadata>> {
        Ok(self
            .lock()
            .records
            .iter()
            .map(|(key, record)| EntryMetadata {
                key: key.clone(),
                size: record.size_known.then_some(record.bytes.len() as u64),
                modified: record.modified,
            })
            .collect())
    }

    async fn remove_all(&self) -> io::Result<usize> {
        let mut state = self.lock();
        let removed = state.records.len();
        state.records.clear();
        Ok(removed)
    }
}
