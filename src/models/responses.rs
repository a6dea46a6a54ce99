//! Response DTOs for the gateway API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Requests answered from a fresh entry
    pub hits: u64,
    /// Requests answered from a stale entry
    pub stale_hits: u64,
    /// Requests that waited for a new upstream call
    pub misses: u64,
    /// Requests that joined an upstream call in flight
    pub joined: u64,
    /// Successful background refreshes
    pub refreshes: u64,
    /// Failed background refreshes
    pub refresh_failures: u64,
    /// Failed foreground upstream calls
    pub fetch_failures: u64,
    /// Current number of entries in cache
    pub total_entries: usize,
    /// Upstream calls currently in flight
    pub in_flight: usize,
    /// Share of requests served without waiting on upstream
    pub hit_rate: f64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from cache statistics
    pub fn new(stats: &CacheStats, in_flight: usize) -> Self {
        Self {
            hits: stats.hits,
            stale_hits: stats.stale_hits,
            misses: stats.misses,
            joined: stats.joined,
            refreshes: stats.refreshes,
            refresh_failures: stats.refresh_failures,
            fetch_failures: stats.fetch_failures,
            total_entries: stats.total_entries,
            in_flight,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Response body for the keys endpoint (GET /cache/keys)
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    /// Number of cached keys
    pub count: usize,
    /// Cached keys, sorted
    pub keys: Vec<String>,
}

impl KeysResponse {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            count: keys.len(),
            keys,
        }
    }
}

/// Response body for the clear endpoint (DELETE /cache)
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// Success message
    pub message: String,
    /// Number of entries removed
    pub removed: usize,
}

impl ClearResponse {
    pub fn new(removed: usize) -> Self {
        Self {
            message: format!("Cleared {} entries", removed),
            removed,
        }
    }
}

/// Response body for the invalidate endpoint (POST /cache/invalidate)
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    /// Upstream URL whose entry was targeted
    pub url: String,
    /// Whether an entry existed and was removed
    pub removed: bool,
}

impl InvalidateResponse {
    pub fn new(url: impl Into<String>, removed: bool) -> Self {
        Self {
            url: url.into(),
            removed,
        }
    }
}

/// Response body for the snapshot endpoint (POST /cache/snapshot)
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotResponse {
    /// Storage key the snapshot was written under
    pub storage_key: String,
    /// Number of entries written
    pub entries: usize,
}

impl SnapshotResponse {
    pub fn new(storage_key: impl Into<String>, entries: usize) -> Self {
        Self {
            storage_key: storage_key.into(),
            entries,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_response_from_stats() {
        let mut stats = CacheStats::new();
        for _ in 0..3 {
            stats.record_hit();
        }
        stats.record_miss();
        stats.set_total_entries(1);

        let resp = StatsResponse::new(&stats, 2);
        assert_eq!(resp.hits, 3);
        assert_eq!(resp.misses, 1);
        assert_eq!(resp.in_flight, 2);
        assert!((resp.hit_rate - 0.75).abs() < 0.001);
    }

    #[test]
    fn test_stats_response_zero_requests() {
        let resp = StatsResponse::new(&CacheStats::new(), 0);
        assert_eq!(resp.hit_rate, 0.0);
    }

    #[test]
    fn test_keys_response_counts() {
        let resp = KeysResponse::new(vec!["a".into(), "b".into()]);
        assert_eq!(resp.count, 2);
    }

    #[test]
    fn test_clear_response_serialize() {
        let json = serde_json::to_string(&ClearResponse::new(4)).unwrap();
        assert!(json.contains("\"removed\":4"));
        assert!(json.contains("Cleared 4 entries"));
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }
}
