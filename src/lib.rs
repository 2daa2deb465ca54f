//! Episode Cache - background episode-list fetching and caching
//!
//! Bounded, dedup-guarded fetch coordination plus a disk-backed cache with
//! TTL expiration and size-triggered eviction.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod refresh;
pub mod tasks;
pub mod timeout;

pub use api::AppState;
pub use cache::ContentCache;
pub use config::Config;
pub use fetch::FetchCoordinator;
pub use refresh::RefreshPipeline;
pub use tasks::spawn_refresh_task;
pub use timeout::with_deadline;
