//! Request Cache - stale-while-revalidate caching for a storefront data API
//!
//! Provides a request cache with in-flight de-duplication and snapshot
//! persistence, and a read-through HTTP gateway built on it.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheOptions, CacheStatus, RequestCache, RequestOptions};
pub use config::Config;
pub use error::{CacheError, Result};
pub use fetch::{FetchRequest, Fetcher, HttpFetcher};
pub use tasks::spawn_snapshot_task;
