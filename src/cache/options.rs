//! Cache Options Module
//!
//! Per-call freshness options and the cache-wide configuration.

use std::time::Duration;

/// Default freshness window.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(5 * 60);

// == Cache Options ==
/// Per-call caching behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// How long an entry is served without contacting upstream
    pub max_age: Duration,
    /// Serve an expired entry at once while refreshing it in the background
    pub stale_while_revalidate: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_MAX_AGE,
            stale_while_revalidate: true,
        }
    }
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_stale_while_revalidate(mut self, enabled: bool) -> Self {
        self.stale_while_revalidate = enabled;
        self
    }
}

// == Cache Config ==
/// Settings shared by every call on one cache instance.
#[derive(Debug, Clone, Default)]
pub struct CacheConfig {
    /// Options used by `RequestCache::get`
    pub defaults: CacheOptions,
    /// Upper bound for one upstream call, `None` waits indefinitely
    pub fetch_timeout: Option<Duration>,
}
