//! Background Tasks Module
//!
//! Contains background tasks that run periodically during gateway operation.
//!
//! # Tasks
//! - Snapshot export: persists the cache contents at a configured interval

mod snapshot;

pub use snapshot::spawn_snapshot_task;
