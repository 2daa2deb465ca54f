//! Cache Module
//!
//! Provides durable episode-list caching with TTL expiration and size-bounded eviction.

mod backend;
mod entry;
mod stats;
mod store;


// Re-export public types
pub use backend::{
    decode_key, encode_key, CacheBackend, EntryMetadata, FileBackend, MemoryBackend,
    MAX_ENCODED_STEM,
};
pub use entry::CacheEntry;
pub use stats::CacheStats;
pub use store::ContentCache;
