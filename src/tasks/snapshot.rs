//! Snapshot Export Task
//!
//! Background task that periodically writes the cache contents to the
//! snapshot store so a restart can start warm.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{RequestCache, SnapshotStore};

/// Spawns a background task that exports a cache snapshot every
/// `interval_secs` seconds.
///
/// Export failures are logged by the cache and the task keeps running.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let handle = spawn_snapshot_task(cache.clone(), store.clone(), "api-cache".into(), 60);
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_snapshot_task(
    cache: RequestCache,
    store: Arc<dyn SnapshotStore>,
    storage_key: String,
    interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting snapshot task with interval of {} seconds",
            interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            if cache
                .export_snapshot_in_background(store.clone(), &storage_key)
                .await
            {
                debug!("Snapshot export: {} entries written", cache.size());
            }
        }
    })
}
