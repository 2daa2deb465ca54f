//! Periodic Refresh Task
//!
//! Background task that re-runs the refresh pipeline on a fixed cadence.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::refresh::RefreshPipeline;

/// Shortest accepted refresh cadence
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Spawns a background task that refreshes every feed once per `interval`.
///
/// The first run starts immediately. Each run is additionally capped by
/// `hard_ceiling`, independent of the pipeline's own deadline; a run that
/// overshoots it is dropped and the next tick proceeds as usual. Ticks that
/// fall due while a run is in progress are delayed, not queued. Intervals
/// below [`MIN_REFRESH_INTERVAL`] are raised to it.
///
/// # Returns
/// A JoinHandle for the spawned task, aborted during graceful shutdown.
///
/// # Example
/// ```ignore
/// let handle = spawn_refresh_task(pipeline.clone(), Duration::from_secs(900), Duration::from_secs(60));
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_refresh_task(
    pipeline: Arc<RefreshPipeline>,
    interval: Duration,
    hard_ceiling: Duration,
) -> JoinHandle<()> {
    if interval < MIN_REFRESH_INTERVAL {
        warn!(
            "Refresh interval {:?} too short, using {:?}",
            interval, MIN_REFRESH_INTERVAL
        );
    }
    let interval = interval.max(MIN_REFRESH_INTERVAL);

    tokio::spawn(async move {
        info!(
            "Starting refresh task with interval of {} seconds",
            interval.as_secs()
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match tokio::time::timeout(hard_ceiling, pipeline.refresh()).await {
                Ok(Ok(report)) if report.is_complete() => {
                    debug!("Periodic refresh: {} feeds up to date", report.refreshed.len());
                }
                Ok(Ok(report)) => {
                    warn!(
                        "Periodic refresh: {} feeds failed: {:?}",
                        report.failed.len(),
                        report.failed.keys().collect::<Vec<_>>()
                    );
                }
                Ok(Err(e)) => warn!("Periodic refresh skipped: {}", e),
                Err(_) => warn!(
                    "Periodic refresh exceeded hard ceiling of {:?}",
                    hard_ceiling
                ),
            }
        }
    })
}
