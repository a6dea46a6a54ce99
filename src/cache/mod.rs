//! Cache Module
//!
//! Provides the stale-while-revalidate request cache and its building blocks.

mod clock;
mod entry;
mod key;
mod options;
mod snapshot;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;
#[cfg(test)]
pub(crate) mod testing;

// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use key::{derive_key, RequestOptions, DEFAULT_METHOD};
pub use options::{CacheConfig, CacheOptions, DEFAULT_MAX_AGE};
pub use snapshot::{FileSnapshotStore, Snapshot, SnapshotEntry, SnapshotStore};
pub use stats::CacheStats;
pub use store::{CacheStatus, Fetched, RequestCache, RequestCacheBuilder};
