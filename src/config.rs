//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;

use crate::models::FeedSource;

/// Default number of fetches allowed to run at once
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 5;

/// Default cache size ceiling (50 MB)
pub const DEFAULT_CACHE_MAX_BYTES: u64 = 50 * 1024 * 1024;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of top-level fetches running at once
    pub max_concurrent_fetches: usize,
    /// Root directory for the on-disk cache
    pub cache_dir: PathBuf,
    /// Logical cache name (sub-directory of `cache_dir`)
    pub cache_namespace: String,
    /// Entry TTL in seconds
    pub cache_ttl: u64,
    /// Aggregate size ceiling of the cache namespace in bytes
    pub cache_max_bytes: u64,
    /// Deadline for one refresh run in seconds
    pub refresh_timeout: u64,
    /// Interval between periodic refreshes in seconds
    pub refresh_interval: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Feeds refreshed by the pipeline
    pub feed_sources: Vec<FeedSource>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_CONCURRENT_FETCHES` - Fetch slots (default: 5)
    /// - `CACHE_DIR` - Cache root directory (default: ./cache)
    /// - `CACHE_NAMESPACE` - Cache sub-directory (default: episodes)
    /// - `CACHE_TTL` - Entry TTL in seconds (default: 3600)
    /// - `CACHE_MAX_BYTES` - Size ceiling in bytes (default: 50 MB)
    /// - `REFRESH_TIMEOUT` - Refresh deadline in seconds (default: 30)
    /// - `REFRESH_INTERVAL` - Refresh cadence in seconds (default: 900)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `FEED_SOURCES` - Comma separated `id=url` pairs (default: none)
    ///
    /// Values that would disable the service are corrected, see [`Config::validated`].
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_fetches: parse_var("MAX_CONCURRENT_FETCHES")
                .unwrap_or(defaults.max_concurrent_fetches),
            cache_dir: env::var("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            cache_namespace: env::var("CACHE_NAMESPACE").unwrap_or(defaults.cache_namespace),
            cache_ttl: parse_var("CACHE_TTL").unwrap_or(defaults.cache_ttl),
            cache_max_bytes: parse_var("CACHE_MAX_BYTES").unwrap_or(defaults.cache_max_bytes),
            refresh_timeout: parse_var("REFRESH_TIMEOUT").unwrap_or(defaults.refresh_timeout),
            refresh_interval: parse_var("REFRESH_INTERVAL").unwrap_or(defaults.refresh_interval),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            feed_sources: env::var("FEED_SOURCES")
                .map(|v| parse_feed_sources(&v))
                .unwrap_or_default(),
        }
        .validated()
    }

    /// Raises zero fetch slots and a zero refresh interval to 1.
    ///
    /// Zero slots would reject every fetch; a zero interval cannot drive a timer.
    pub fn validated(mut self) -> Self {
        if self.max_concurrent_fetches == 0 {
            warn!("MAX_CONCURRENT_FETCHES=0 would reject every fetch, using 1");
            self.max_concurrent_fetches = 1;
        }
        if self.refresh_interval == 0 {
            warn!("REFRESH_INTERVAL=0 is not a valid cadence, using 1 second");
            self.refresh_interval = 1;
        }
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            cache_dir: PathBuf::from("./cache"),
            cache_namespace: "episodes".to_string(),
            cache_ttl: 3600,
            cache_max_bytes: DEFAULT_CACHE_MAX_BYTES,
            refresh_timeout: 30,
            refresh_interval: 900,
            server_port: 3000,
            feed_sources: Vec::new(),
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Parses `id=url` pairs separated by commas. Malformed pairs are skipped.
pub fn parse_feed_sources(raw: &str) -> Vec<FeedSource> {
    raw.split(',')
        .filter_map(|pair| {
            let (id, url) = pair.split_once('=')?;
            let (id, url) = (id.trim(), url.trim());
            if id.is_empty() || url.is_empty() {
                return None;
            }
            Some(FeedSource::new(id, url))
        })
        .collect()
}
