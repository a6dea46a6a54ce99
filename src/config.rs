//! Configuration Module
//!
//! Handles loading and managing gateway configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::{CacheConfig, CacheOptions};

/// Gateway configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the upstream data API
    pub upstream_url: String,
    /// HTTP server port
    pub server_port: u16,
    /// Seconds an entry stays fresh
    pub default_max_age: u64,
    /// Serve stale entries while refreshing them
    pub stale_while_revalidate: bool,
    /// Seconds allowed per upstream call, 0 = no limit
    pub fetch_timeout: u64,
    /// Snapshot directory, `None` = platform cache directory
    pub snapshot_dir: Option<PathBuf>,
    /// Storage key of the snapshot
    pub snapshot_key: String,
    /// Seconds between snapshot exports, 0 = only on shutdown
    pub snapshot_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `UPSTREAM_URL` - Upstream base URL (default: http://127.0.0.1:54321/rest/v1)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `DEFAULT_MAX_AGE` - Freshness window in seconds (default: 300)
    /// - `STALE_WHILE_REVALIDATE` - Serve stale while refreshing (default: true)
    /// - `FETCH_TIMEOUT` - Upstream timeout in seconds, 0 disables (default: 30)
    /// - `SNAPSHOT_DIR` - Snapshot directory (default: platform cache dir)
    /// - `SNAPSHOT_KEY` - Snapshot storage key (default: api-cache)
    /// - `SNAPSHOT_INTERVAL` - Export interval in seconds, 0 disables (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            upstream_url: env::var("UPSTREAM_URL")
                .ok()
                .map(|v| v.trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.upstream_url),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            default_max_age: parse_var("DEFAULT_MAX_AGE").unwrap_or(defaults.default_max_age),
            stale_while_revalidate: parse_var("STALE_WHILE_REVALIDATE")
                .unwrap_or(defaults.stale_while_revalidate),
            fetch_timeout: parse_var("FETCH_TIMEOUT").unwrap_or(defaults.fetch_timeout),
            snapshot_dir: env::var("SNAPSHOT_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            snapshot_key: env::var("SNAPSHOT_KEY")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.snapshot_key),
            snapshot_interval: parse_var("SNAPSHOT_INTERVAL")
                .unwrap_or(defaults.snapshot_interval),
        }
    }

    /// Per-call options used when a request does not override them.
    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions::new()
            .with_max_age(Duration::from_secs(self.default_max_age))
            .with_stale_while_revalidate(self.stale_while_revalidate)
    }

    /// Cache-wide settings derived from this configuration.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            defaults: self.cache_options(),
            fetch_timeout: (self.fetch_timeout > 0).then(|| Duration::from_secs(self.fetch_timeout)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upstream_url: "http://127.0.0.1:54321/rest/v1".to_string(),
            server_port: 3000,
            default_max_age: 300,
            stale_while_revalidate: true,
            fetch_timeout: 30,
            snapshot_dir: None,
            snapshot_key: "api-cache".to_string(),
            snapshot_interval: 60,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
