//! Domain types and response models
//!
//! Episode payloads, feed descriptors and the DTOs serialized by the
//! operator API.

pub mod episode;
pub mod responses;

// Re-export commonly used types
pub use episode::{Episode, FeedSource};
pub use responses::{
    ClearResponse, CoordinatorStats, EpisodesResponse, HealthResponse, RefreshResponse,
    StatsResponse,
};
