//! Response DTOs for the operator API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;
use crate::models::Episode;
use crate::refresh::RefreshReport;

/// Response body for GET /episodes/:feed_id
#[derive(Debug, Clone, Serialize)]
pub struct EpisodesResponse {
    pub feed_id: String,
    pub count: usize,
    pub episodes: Vec<Episode>,
}

impl EpisodesResponse {
    pub fn new(feed_id: impl Into<String>, episodes: Vec<Episode>) -> Self {
        Self {
            feed_id: feed_id.into(),
            count: episodes.len(),
            episodes,
        }
    }
}

/// Response body for DELETE /episodes and DELETE /episodes/:feed_id
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// Success message
    pub message: String,
}

impl ClearResponse {
    pub fn feed(feed_id: &str) -> Self {
        Self {
            message: format!("Feed '{}' cleared", feed_id),
        }
    }

    pub fn all() -> Self {
        Self {
            message: "Cache cleared".to_string(),
        }
    }
}

/// Coordinator section of the stats endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorStats {
    pub active_count: usize,
    pub max_concurrent: usize,
    /// Keys of the running fetches, sorted
    pub active_keys: Vec<String>,
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub coordinator: CoordinatorStats,
    pub cache: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl StatsResponse {
    pub fn new(coordinator: CoordinatorStats, cache: CacheStats) -> Self {
        Self {
            hit_rate: cache.hit_rate(),
            coordinator,
            cache,
        }
    }
}

/// Response body for POST /refresh
#[derive(Debug, Clone, Serialize)]
pub struct RefreshResponse {
    /// "complete" when every feed refreshed, "partial" otherwise
    pub status: String,
    #[serde(flatten)]
    pub report: RefreshReport,
}

impl From<RefreshReport> for RefreshResponse {
    fn from(report: RefreshReport) -> Self {
        let status = if report.is_complete() {
            "complete"
        } else {
            "partial"
        };
        Self {
            status: status.to_string(),
            report,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
