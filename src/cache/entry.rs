//! Cache Entry Module
//!
//! Defines the persisted record for one cached episode listing.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// == Cache Entry ==
/// A cached payload together with the time it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// The stored items, in the order they were given
    pub items: Vec<T>,
    /// Write timestamp (millisecond precision once persisted)
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub stored_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates an entry stamped with the current time.
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            stored_at: Utc::now(),
        }
    }

    // == Age ==
    /// Time elapsed since the entry was written at `now`.
    ///
    /// A timestamp in the future (clock moved backwards) counts as zero age.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.stored_at).to_std().unwrap_or(Duration::ZERO)
    }

    // == Is Expired ==
    /// Checks expiry against a given clock reading.
    ///
    /// Boundary condition: the entry expires once its age is strictly greater
    /// than the TTL; an entry exactly `ttl` old is still served.
    pub fn is_expired_at(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        self.age_at(now) > ttl
    }

    /// Checks expiry against the current time.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.is_expired_at(ttl, Utc::now())
    }
}
