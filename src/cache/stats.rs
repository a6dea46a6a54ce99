//! Cache Statistics Module
//!
//! Tracks how requests were served and how upstream calls ended.

use serde::Serialize;

// == Cache Stats ==
/// Request cache counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Requests answered from a fresh entry
    pub hits: u64,
    /// Requests answered from a stale entry while a refresh ran
    pub stale_hits: u64,
    /// Requests that started an upstream call and waited for it
    pub misses: u64,
    /// Requests that joined an upstream call already in flight
    pub joined: u64,
    /// Background refreshes that completed successfully
    pub refreshes: u64,
    /// Background refreshes that failed (stale entry kept)
    pub refresh_failures: u64,
    /// Foreground upstream calls that failed
    pub fetch_failures: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Share of requests served without waiting on upstream.
    ///
    /// Returns (hits + stale_hits) / all requests, or 0.0 if there were none.
    pub fn hit_rate(&self) -> f64 {
        let served = self.hits + self.stale_hits;
        let total = served + self.misses + self.joined;
        if total == 0 {
            0.0
        } else {
            served as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_stale_hit(&mut self) {
        self.stale_hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_join(&mut self) {
        self.joined += 1;
    }

    pub fn record_refresh(&mut self) {
        self.refreshes += 1;
    }

    pub fn record_refresh_failure(&mut self) {
        self.refresh_failures += 1;
    }

    pub fn record_fetch_failure(&mut self) {
        self.fetch_failures += 1;
    }

    // == Update Entry Count ==
    /// Updates the total entries count.
    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
