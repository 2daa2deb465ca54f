//! Refresh Pipeline
//!
//! Fetches every configured feed as one coordinator batch, writes each
//! listing to the cache as it arrives, and bounds the whole run with a
//! deadline.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::cache::ContentCache;
use crate::error::{FetchError, RefreshError};
use crate::fetch::{sub_fetch, BatchResult, FetchCoordinator, SubFetch};
use crate::models::{Episode, FeedSource};
use crate::refresh::EpisodeSource;
use crate::timeout::with_deadline;

/// Coordinator key every refresh run is admitted under
pub const REFRESH_KEY: &str = "refresh";

// == Refresh Report ==
/// Per-feed outcome of a refresh run that finished inside its deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    /// Feed id -> number of episodes cached
    pub refreshed: BTreeMap<String, usize>,
    /// Feed id -> failure description
    pub failed: BTreeMap<String, String>,
    pub elapsed_ms: u64,
}

impl RefreshReport {
    fn from_results(results: BatchResult<usize>, elapsed: Duration) -> Self {
        let mut refreshed = BTreeMap::new();
        let mut failed = BTreeMap::new();
        for (feed_id, outcome) in results {
            match outcome {
                Ok(count) => {
                    refreshed.insert(feed_id, count);
                }
                Err(e) => {
                    failed.insert(feed_id, e.to_string());
                }
            }
        }
        Self {
            refreshed,
            failed,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    /// Whether every feed was refreshed
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

// == Refresh Pipeline ==
pub struct RefreshPipeline {
    coordinator: FetchCoordinator,
    cache: Arc<ContentCache<Episode>>,
    source: Arc<dyn EpisodeSource>,
    feeds: Vec<FeedSource>,
    budget: Duration,
}

impl RefreshPipeline {
    pub fn new(
        coordinator: FetchCoordinator,
        cache: Arc<ContentCache<Episode>>,
        source: Arc<dyn EpisodeSource>,
        feeds: Vec<FeedSource>,
        budget: Duration,
    ) -> Self {
        Self {
            coordinator,
            cache,
            source,
            feeds,
            budget,
        }
    }

    pub fn feeds(&self) -> &[FeedSource] {
        &self.feeds
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Runs one refresh of every feed.
    ///
    /// Individual feed failures land in the report. The run itself fails
    /// when it cannot be admitted, when the batch worker dies, or when the
    /// deadline passes; on timeout the batch key is cancelled so the next
    /// refresh can be admitted, and feeds not yet started are skipped.
    pub async fn refresh(&self) -> Result<RefreshReport, RefreshError> {
        let started = Instant::now();
        let handle = self
            .coordinator
            .start_batch_fetch(REFRESH_KEY, self.feed_operations())?;
        info!("Refresh started for {} feeds", self.feeds.len());

        let outcome = with_deadline(self.budget, async {
            handle.join().await.map_err(|_| RefreshError::Aborted)
        })
        .await;

        match outcome {
            Ok(results) => {
                let report = RefreshReport::from_results(results, started.elapsed());
                info!(
                    "Refresh finished in {}ms: {} refreshed, {} failed",
                    report.elapsed_ms,
                    report.refreshed.len(),
                    report.failed.len()
                );
                Ok(report)
            }
            Err(e) => {
                if matches!(e, RefreshError::Timeout(_)) {
                    self.coordinator.cancel_fetch(REFRESH_KEY);
                }
                warn!("Refresh failed: {}", e);
                Err(e)
            }
        }
    }

    /// One sub-fetch per feed: fetch unless cancelled, then cache.
    fn feed_operations(&self) -> Vec<(String, SubFetch<usize>)> {
        self.feeds
            .iter()
            .map(|feed| {
                let feed = feed.clone();
                let source = self.source.clone();
                let cache = self.cache.clone();
                let feed_id = feed.id.clone();

                let operation = sub_fetch(move |cancel| async move {
                    let fetched = tokio::select! {
                        _ = cancel.cancelled() => Err(FetchError::Cancelled),
                        result = source.fetch_episodes(&feed) => result,
                    };
                    let episodes = fetched?;
                    let count = episodes.len();
                    cache.store(&feed.id, episodes).await;
                    Ok(count)
                });
                (feed_id, operation)
            })
            .collect()
    }
}
