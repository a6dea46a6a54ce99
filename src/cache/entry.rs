//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with freshness checks.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

// == Cache Entry ==
/// A stored response snapshot and the time it was fetched.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored payload, shared with every reader
    pub value: Arc<Value>,
    /// Fetch timestamp (Unix milliseconds)
    pub stored_at: i64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stored at `stored_at`.
    pub fn new(value: Arc<Value>, stored_at: i64) -> Self {
        Self { value, stored_at }
    }

    // == Replacement ==
    /// Builds the entry that replaces `self`, keeping `stored_at`
    /// non-decreasing even if the clock stepped backwards.
    pub fn replaced_by(&self, value: Arc<Value>, now: i64) -> Self {
        Self::new(value, now.max(self.stored_at))
    }

    // == Age ==
    /// Returns the entry age in milliseconds at `now`, never negative.
    pub fn age_ms(&self, now: i64) -> u64 {
        now.saturating_sub(self.stored_at).max(0) as u64
    }

    // == Is Fresh ==
    /// Checks whether the entry is still fresh.
    ///
    /// Boundary condition: an entry whose age equals `max_age` is stale.
    pub fn is_fresh(&self, now: i64, max_age: Duration) -> bool {
        u128::from(self.age_ms(now)) < max_age.as_millis()
    }
}
