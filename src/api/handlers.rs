//! API Handlers
//!
//! HTTP request handlers for each operator endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::ContentCache;
use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::fetch::FetchCoordinator;
use crate::models::{
    ClearResponse, CoordinatorStats, Episode, EpisodesResponse, FeedSource, HealthResponse,
    RefreshResponse, StatsResponse,
};
use crate::refresh::{EpisodeSource, HttpEpisodeSource, RefreshPipeline};

/// Application state shared across all handlers.
///
/// Every field is a shared handle; clones see the same coordinator, cache
/// and pipeline.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: FetchCoordinator,
    pub cache: Arc<ContentCache<Episode>>,
    pub pipeline: Arc<RefreshPipeline>,
}

impl AppState {
    /// Wires a pipeline over the given coordinator, cache and source.
    pub fn new(
        coordinator: FetchCoordinator,
        cache: Arc<ContentCache<Episode>>,
        source: Arc<dyn EpisodeSource>,
        feeds: Vec<FeedSource>,
        refresh_budget: Duration,
    ) -> Self {
        let pipeline = Arc::new(RefreshPipeline::new(
            coordinator.clone(),
            cache.clone(),
            source,
            feeds,
            refresh_budget,
        ));
        Self {
            coordinator,
            cache,
            pipeline,
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Uses the on-disk cache under `cache_dir/cache_namespace` and fetches
    /// feeds over HTTP.
    pub fn from_config(config: &Config) -> Self {
        let cache = ContentCache::open(
            &config.cache_dir,
            &config.cache_namespace,
            Duration::from_secs(config.cache_ttl),
            config.cache_max_bytes,
        );
        Self::new(
            FetchCoordinator::new(config.max_concurrent_fetches),
            Arc::new(cache),
            Arc::new(HttpEpisodeSource::new()),
            config.feed_sources.clone(),
            Duration::from_secs(config.refresh_timeout),
        )
    }
}

/// Handler for GET /episodes/:feed_id
///
/// Returns the cached listing; absent and expired entries are 404.
pub async fn get_episodes_handler(
    State(state): State<AppState>,
    Path(feed_id): Path<String>,
) -> Result<Json<EpisodesResponse>> {
    let episodes = state
        .cache
        .fetch(&feed_id)
        .await
        .ok_or_else(|| ApiError::NotFound(feed_id.clone()))?;

    Ok(Json(EpisodesResponse::new(feed_id, episodes)))
}

/// Handler for DELETE /episodes/:feed_id
pub async fn clear_feed_handler(
    State(state): State<AppState>,
    Path(feed_id): Path<String>,
) -> Json<ClearResponse> {
    state.cache.clear(&feed_id).await;
    Json(ClearResponse::feed(&feed_id))
}

/// Handler for DELETE /episodes
pub async fn clear_all_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.cache.clear_all().await;
    Json(ClearResponse::all())
}

/// Handler for POST /refresh
///
/// Runs the pipeline and waits for it, within the pipeline's deadline.
pub async fn refresh_handler(State(state): State<AppState>) -> Result<Json<RefreshResponse>> {
    let report = state.pipeline.refresh().await?;
    Ok(Json(RefreshResponse::from(report)))
}

/// Handler for GET /stats
///
/// Returns coordinator occupancy and cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let coordinator = CoordinatorStats {
        active_count: state.coordinator.active_count(),
        max_concurrent: state.coordinator.max_concurrent(),
        active_keys: state.coordinator.active_keys(),
    };
    let cache = state.cache.snapshot().await;

    Json(StatsResponse::new(coordinator, cache))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
