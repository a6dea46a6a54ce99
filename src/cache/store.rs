//! Request Cache Module
//!
//! Stale-while-revalidate cache engine with in-flight de-duplication.
//!
//! Every request resolves in this order:
//! 1. a fresh entry is returned without contacting upstream;
//! 2. a request already in flight for the same key is joined; if it is a
//!    failing refresh of a stale entry, the stale value is served instead;
//! 3. a stale entry is returned at once when revalidation is enabled, and a
//!    detached refresh updates it for later callers;
//! 4. otherwise upstream is called and the caller waits for the result.

use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{
    derive_key, CacheConfig, CacheEntry, CacheOptions, CacheStats, Clock, RequestOptions,
    Snapshot, SnapshotEntry, SnapshotStore, SystemClock,
};
use crate::error::{CacheError, Result};
use crate::fetch::{FetchRequest, Fetcher};

/// Result of one upstream call, awaited by every caller that joined it.
type SharedFetch = Shared<BoxFuture<'static, Result<Arc<Value>>>>;

// == Cache Status ==
/// How a value was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Fresh entry, no upstream call
    Hit,
    /// Stale entry, refresh started in the background
    Stale,
    /// Upstream call started by this request
    Miss,
    /// Upstream call started by an earlier request
    Joined,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Stale => "stale",
            CacheStatus::Miss => "miss",
            CacheStatus::Joined => "joined",
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A served value and how it was obtained.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub value: Arc<Value>,
    pub status: CacheStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchMode {
    /// A caller is waiting on the result
    Foreground,
    /// Revalidation of a stale entry nobody waits for
    Background,
}

struct InFlight {
    /// Identifies the call; only the registered ticket may store its result
    ticket: u64,
    mode: FetchMode,
    response: SharedFetch,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    in_flight: HashMap<String, InFlight>,
    stats: CacheStats,
    next_ticket: u64,
}

struct Inner {
    fetcher: Arc<dyn Fetcher>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
    state: Mutex<CacheState>,
}

impl Inner {
    // The lock is never held across an await, and no code path panics while
    // holding it, so a poisoned guard still protects consistent data.
    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// == Request Cache ==
/// Cheaply cloneable handle to one cache instance.
///
/// Clones share entries, in-flight calls and statistics.
#[derive(Clone)]
pub struct RequestCache {
    inner: Arc<Inner>,
}

impl fmt::Debug for RequestCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock_state();
        f.debug_struct("RequestCache")
            .field("entries", &state.entries.len())
            .field("in_flight", &state.in_flight.len())
            .field("config", &self.inner.config)
            .finish()
    }
}

// == Builder ==
/// Assembles a [`RequestCache`].
pub struct RequestCacheBuilder {
    fetcher: Arc<dyn Fetcher>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
}

impl RequestCacheBuilder {
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    pub fn defaults(mut self, defaults: CacheOptions) -> Self {
        self.config.defaults = defaults;
        self
    }

    pub fn fetch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.fetch_timeout = timeout;
        self
    }

    pub fn build(self) -> RequestCache {
        RequestCache {
            inner: Arc::new(Inner {
                fetcher: self.fetcher,
                clock: self.clock,
                config: self.config,
                state: Mutex::new(CacheState::default()),
            }),
        }
    }
}

impl RequestCache {
    // == Constructors ==
    /// Creates a cache with default options, the wall clock and no timeout.
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self::builder(fetcher).build()
    }

    pub fn builder(fetcher: Arc<dyn Fetcher>) -> RequestCacheBuilder {
        RequestCacheBuilder {
            fetcher,
            clock: Arc::new(SystemClock),
            config: CacheConfig::default(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    // == Fetch ==
    /// Fetches `url` with the cache-wide default options as a plain `GET`.
    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let defaults = self.inner.config.defaults;
        self.fetch(url, &defaults, &RequestOptions::default()).await
    }

    /// Fetches `url` and deserializes the payload into `T`.
    ///
    /// A payload that does not match `T` fails this call with
    /// [`CacheError::Decode`]; the cached entry itself stays valid.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        url: &str,
        options: &CacheOptions,
        request: &RequestOptions,
    ) -> Result<T> {
        let fetched = self.fetch_entry(url, options, request).await?;
        <T as Deserialize>::deserialize(fetched.value.as_ref())
            .map_err(|e| CacheError::Decode(e.to_string()))
    }

    /// Fetches `url` and returns the shared payload with its [`CacheStatus`].
    pub async fn fetch_entry(
        &self,
        url: &str,
        options: &CacheOptions,
        request: &RequestOptions,
    ) -> Result<Fetched> {
        let key = derive_key(url, request);

        // Lookup and in-flight registration happen under one lock so two
        // callers can never both decide to start a call for the same key.
        let (pending, status, fallback) = {
            let mut state = self.inner.lock_state();
            let now = self.inner.clock.now_ms();

            let cached = state
                .entries
                .get(&key)
                .map(|entry| (entry.is_fresh(now, options.max_age), entry.value.clone()));

            if let Some((true, value)) = &cached {
                state.stats.record_hit();
                debug!(key = %key, "cache hit");
                return Ok(Fetched {
                    value: value.clone(),
                    status: CacheStatus::Hit,
                });
            }

            if let Some(flight) = state.in_flight.get(&key) {
                let response = flight.response.clone();
                // A stale entry stays servable while its refresh runs, even if
                // the refresh then fails.
                let fallback = match (flight.mode, cached) {
                    (FetchMode::Background, Some((_, stale)))
                        if options.stale_while_revalidate =>
                    {
                        Some(stale)
                    }
                    _ => None,
                };
                state.stats.record_join();
                debug!(key = %key, "joining in-flight request");
                (response, CacheStatus::Joined, fallback)
            } else if let Some((_, stale)) = cached.filter(|_| options.stale_while_revalidate) {
                let request = FetchRequest::new(url, request.clone());
                // Nobody awaits the refresh; its task settles the entry
                let _ = self.start_fetch(&mut state, key.clone(), request, FetchMode::Background);
                state.stats.record_stale_hit();
                debug!(key = %key, "serving stale entry, revalidating");
                return Ok(Fetched {
                    value: stale,
                    status: CacheStatus::Stale,
                });
            } else {
                let request = FetchRequest::new(url, request.clone());
                let response =
                    self.start_fetch(&mut state, key.clone(), request, FetchMode::Foreground);
                state.stats.record_miss();
                debug!(key = %key, "cache miss");
                (response, CacheStatus::Miss, None)
            }
        };

        match (pending.await, fallback) {
            (Ok(value), _) => Ok(Fetched { value, status }),
            (Err(err), Some(stale)) => {
                debug!(key = %key, error = %err, "joined refresh failed, serving stale entry");
                Ok(Fetched {
                    value: stale,
                    status: CacheStatus::Stale,
                })
            }
            (Err(err), None) => Err(err),
        }
    }

    /// Spawns the upstream call for `key` and registers it as in flight.
    ///
    /// The call runs as its own task, so it completes and updates the cache
    /// even if every caller waiting on it goes away.
    fn start_fetch(
        &self,
        state: &mut CacheState,
        key: String,
        request: FetchRequest,
        mode: FetchMode,
    ) -> SharedFetch {
        let ticket = state.next_ticket;
        state.next_ticket += 1;

        let cache = self.clone();
        let task_key = key.clone();
        let task = tokio::spawn(async move {
            let outcome = match AssertUnwindSafe(cache.call_upstream(&request))
                .catch_unwind()
                .await
            {
                Ok(result) => result.map(Arc::new),
                Err(_) => Err(CacheError::Internal("upstream call panicked".to_string())),
            };
            cache.settle(&task_key, ticket, &outcome, mode);
            outcome
        });

        let response = async move {
            task.await.unwrap_or_else(|e| {
                Err(CacheError::Internal(format!("fetch task failed: {}", e)))
            })
        }
        .boxed()
        .shared();

        state.in_flight.insert(
            key,
            InFlight {
                ticket,
                mode,
                response: response.clone(),
            },
        );
        response
    }

    async fn call_upstream(&self, request: &FetchRequest) -> Result<Value> {
        let call = self.inner.fetcher.fetch(request);
        match self.inner.config.fetch_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| CacheError::Timeout(limit))?,
            None => call.await,
        }
    }

    /// Records the outcome of a finished call and releases its key.
    fn settle(&self, key: &str, ticket: u64, outcome: &Result<Arc<Value>>, mode: FetchMode) {
        let mut state = self.inner.lock_state();

        if state.in_flight.get(key).map(|flight| flight.ticket) != Some(ticket) {
            // Detached by invalidate/clear while running
            debug!(key = %key, "discarding result of invalidated request");
            return;
        }
        state.in_flight.remove(key);

        match outcome {
            Ok(value) => {
                let now = self.inner.clock.now_ms();
                let entry = match state.entries.get(key) {
                    Some(previous) => previous.replaced_by(value.clone(), now),
                    None => CacheEntry::new(value.clone(), now),
                };
                state.entries.insert(key.to_string(), entry);
                let count = state.entries.len();
                state.stats.set_total_entries(count);
                if mode == FetchMode::Background {
                    state.stats.record_refresh();
                    debug!(key = %key, "background refresh stored");
                }
            }
            Err(err) => match mode {
                FetchMode::Background => {
                    state.stats.record_refresh_failure();
                    warn!(key = %key, error = %err, "background refresh failed, keeping stale entry");
                }
                FetchMode::Foreground => {
                    state.stats.record_fetch_failure();
                    debug!(key = %key, error = %err, "upstream call failed");
                }
            },
        }
    }

    // == Invalidation ==
    /// Removes the entry for exactly this request.
    ///
    /// A call still in flight for the key is detached: it finishes for the
    /// callers already waiting on it but does not repopulate the entry.
    /// Returns whether an entry was removed.
    pub fn invalidate(&self, url: &str, request: &RequestOptions) -> bool {
        let key = derive_key(url, request);
        let mut state = self.inner.lock_state();
        state.in_flight.remove(&key);
        let removed = state.entries.remove(&key).is_some();
        let count = state.entries.len();
        state.stats.set_total_entries(count);
        debug!(key = %key, removed, "invalidated");
        removed
    }

    /// Removes every entry and detaches every in-flight call.
    ///
    /// Returns the number of entries removed.
    pub fn clear(&self) -> usize {
        let mut state = self.inner.lock_state();
        let removed = state.entries.len();
        state.entries.clear();
        state.in_flight.clear();
        state.stats.set_total_entries(0);
        info!("Cache cleared: removed {} entries", removed);
        removed
    }

    // == Introspection ==
    /// Returns the number of cached entries, fresh or stale.
    pub fn size(&self) -> usize {
        self.inner.lock_state().entries.len()
    }

    /// Returns all cached keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.lock_state().entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Returns the number of upstream calls currently tracked as in flight.
    pub fn in_flight(&self) -> usize {
        self.inner.lock_state().in_flight.len()
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let state = self.inner.lock_state();
        let mut stats = state.stats.clone();
        stats.set_total_entries(state.entries.len());
        stats
    }

    // == Snapshots ==
    /// Copies every entry into a serializable snapshot.
    pub fn snapshot(&self) -> Snapshot {
        // Payloads are deep-copied only after the lock is released
        let shared: Vec<(String, Arc<Value>, i64)> = {
            let state = self.inner.lock_state();
            state
                .entries
                .iter()
                .map(|(key, entry)| (key.clone(), entry.value.clone(), entry.stored_at))
                .collect()
        };

        let entries = shared
            .into_iter()
            .map(|(key, value, stored_at)| {
                (
                    key,
                    SnapshotEntry {
                        data: value.as_ref().clone(),
                        timestamp: stored_at,
                    },
                )
            })
            .collect();
        Snapshot { entries }
    }

    /// Merges a snapshot into the cache.
    ///
    /// An imported entry replaces an existing one only if it is not older.
    /// Returns the number of entries applied.
    pub fn restore(&self, snapshot: Snapshot) -> usize {
        let mut state = self.inner.lock_state();
        let mut applied = 0;
        for (key, imported) in snapshot.entries {
            let newer = state
                .entries
                .get(&key)
                .map_or(true, |existing| existing.stored_at <= imported.timestamp);
            if newer {
                state.entries.insert(
                    key,
                    CacheEntry::new(Arc::new(imported.data), imported.timestamp),
                );
                applied += 1;
            }
        }
        let count = state.entries.len();
        state.stats.set_total_entries(count);
        applied
    }

    /// Writes a snapshot to `store` under `storage_key`.
    ///
    /// Failures are logged and reported as `false`, never propagated.
    pub fn export_snapshot<S>(&self, store: &S, storage_key: &str) -> bool
    where
        S: SnapshotStore + ?Sized,
    {
        let snapshot = self.snapshot();
        match snapshot
            .to_json()
            .and_then(|raw| store.save(storage_key, &raw))
        {
            Ok(()) => {
                debug!(storage_key, entries = snapshot.len(), "cache snapshot exported");
                true
            }
            Err(err) => {
                warn!(storage_key, error = %err, "failed to export cache snapshot");
                false
            }
        }
    }

    /// Loads the snapshot saved under `storage_key` and merges it.
    ///
    /// A missing snapshot is not an error. Unreadable or malformed data is
    /// logged, leaves the cache untouched and is reported as `false`.
    pub fn import_snapshot<S>(&self, store: &S, storage_key: &str) -> bool
    where
        S: SnapshotStore + ?Sized,
    {
        let loaded = store
            .load(storage_key)
            .and_then(|raw| raw.map(|raw| Snapshot::from_json(&raw)).transpose());
        match loaded {
            Ok(Some(snapshot)) => {
                let applied = self.restore(snapshot);
                info!("Cache snapshot imported: {} entries from '{}'", applied, storage_key);
                true
            }
            Ok(None) => {
                debug!(storage_key, "no cache snapshot to import");
                true
            }
            Err(err) => {
                warn!(storage_key, error = %err, "failed to import cache snapshot");
                false
            }
        }
    }

    /// Runs [`RequestCache::export_snapshot`] on the blocking thread pool.
    pub async fn export_snapshot_in_background(
        &self,
        store: Arc<dyn SnapshotStore>,
        storage_key: &str,
    ) -> bool {
        let cache = self.clone();
        let storage_key = storage_key.to_string();
        tokio::task::spawn_blocking(move || cache.export_snapshot(store.as_ref(), &storage_key))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "snapshot export task failed");
                false
            })
    }

    /// Runs [`RequestCache::import_snapshot`] on the blocking thread pool.
    pub async fn import_snapshot_in_background(
        &self,
        store: Arc<dyn SnapshotStore>,
        storage_key: &str,
    ) -> bool {
        let cache = self.clone();
        let storage_key = storage_key.to_string();
        tokio::task::spawn_blocking(move || cache.import_snapshot(store.as_ref(), &storage_key))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "snapshot import task failed");
                false
            })
    }
}
