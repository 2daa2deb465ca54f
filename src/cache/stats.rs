//! Cache counters
//!
//! Running totals kept by a `ContentCache`, plus the namespace footprint
//! filled in when a snapshot is taken.

use serde::Serialize;

// == Cache Stats ==
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Fetches answered from the cache
    pub hits: u64,
    /// Fetches that found nothing usable (absent, expired or unreadable)
    pub misses: u64,
    /// Entries deleted on read because their TTL had passed
    pub expirations: u64,
    /// Entries removed by the size ceiling
    pub evictions: u64,
    /// Stores that never reached the backend
    pub write_failures: u64,
    /// Entries in the namespace at snapshot time
    pub total_entries: usize,
    /// Bytes in the namespace at snapshot time; unknown sizes count as zero
    pub total_bytes: u64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fraction of fetches that were hits, 0.0 before the first fetch.
    pub fn hit_rate(&self) -> f64 {
        match self.hits + self.misses {
            0 => 0.0,
            lookups => self.hits as f64 / lookups as f64,
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_expiration(&mut self) {
        self.expirations += 1;
    }

    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    pub fn record_write_failure(&mut self) {
        self.write_failures += 1;
    }

    pub fn set_footprint(&mut self, entries: usize, bytes: u64) {
        self.total_entries = entries;
        self.total_bytes = bytes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_stats_are_zeroed() {
        let stats = CacheStats::new();
        assert_eq!(stats, CacheStats::default());
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_counts_hits_over_lookups() {
        let mut stats = CacheStats::new();
        (0..3).for_each(|_| stats.record_hit());
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_counters_accumulate() {
        let mut stats = CacheStats::new();
        stats.record_evictions(3);
        stats.record_evictions(2);
        stats.record_expiration();
        stats.record_write_failure();
        stats.set_footprint(4, 1024);

        assert_eq!(stats.evictions, 5);
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.write_failures, 1);
        assert_eq!((stats.total_entries, stats.total_bytes), (4, 1024));
    }
}
