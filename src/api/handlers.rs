//! API Handlers
//!
//! HTTP request handlers for each gateway endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{HeaderMap, HeaderValue, Method},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use crate::cache::{CacheOptions, FileSnapshotStore, RequestCache, RequestOptions, SnapshotStore};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::fetch::HttpFetcher;
use crate::models::{
    ClearResponse, HealthResponse, InvalidateRequest, InvalidateResponse, KeysResponse,
    SnapshotResponse, StatsResponse,
};

/// Request headers forwarded upstream. They also take part in the cache key,
/// so responses for different users are never mixed.
pub const FORWARDED_HEADERS: &[&str] = &["authorization", "apikey", "accept-profile", "content-profile"];

/// Response header reporting how the value was served.
pub const CACHE_STATUS_HEADER: &str = "x-cache";
/// Request header overriding the freshness window, in seconds.
pub const MAX_AGE_HEADER: &str = "x-cache-max-age";
/// Request header overriding stale-while-revalidate (`true`/`false`).
pub const REVALIDATE_HEADER: &str = "x-cache-revalidate";

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared request cache
    pub cache: RequestCache,
    /// Upstream base URL, without trailing slash
    pub upstream_url: String,
    /// Where snapshots are written, if anywhere
    pub snapshots: Option<Arc<dyn SnapshotStore>>,
    /// Storage key of the snapshot
    pub snapshot_key: String,
}

impl AppState {
    /// Creates a new AppState around the given cache, without snapshots.
    pub fn new(cache: RequestCache, upstream_url: impl Into<String>) -> Self {
        Self {
            cache,
            upstream_url: upstream_url.into().trim_end_matches('/').to_string(),
            snapshots: None,
            snapshot_key: "api-cache".to_string(),
        }
    }

    /// Attaches a snapshot store.
    pub fn with_snapshots(
        mut self,
        store: Arc<dyn SnapshotStore>,
        snapshot_key: impl Into<String>,
    ) -> Self {
        self.snapshots = Some(store);
        self.snapshot_key = snapshot_key.into();
        self
    }

    /// Creates a new AppState from configuration.
    ///
    /// Builds an HTTP-backed cache and, when a snapshot directory can be
    /// determined, a file snapshot store.
    pub fn from_config(config: &Config) -> Self {
        let cache = RequestCache::builder(Arc::new(HttpFetcher::new()))
            .config(config.cache_config())
            .build();
        let state = Self::new(cache, config.upstream_url.clone());

        let store = config
            .snapshot_dir
            .clone()
            .map(FileSnapshotStore::with_dir)
            .or_else(FileSnapshotStore::new);
        match store {
            Some(store) => state.with_snapshots(Arc::new(store), config.snapshot_key.clone()),
            None => state,
        }
    }

    /// Joins the upstream base URL with a path and optional query string.
    pub fn upstream(&self, path: &str, query: Option<&str>) -> String {
        let mut url = format!("{}/{}", self.upstream_url, path.trim_start_matches('/'));
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }
        url
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
}

/// Applies per-request overrides on top of the configured defaults.
/// Unparsable override values are ignored.
fn cache_options(headers: &HeaderMap, defaults: CacheOptions) -> CacheOptions {
    let mut options = defaults;
    if let Some(secs) = header_value(headers, MAX_AGE_HEADER).and_then(|v| v.parse::<u64>().ok()) {
        options = options.with_max_age(Duration::from_secs(secs));
    }
    if let Some(flag) = header_value(headers, REVALIDATE_HEADER).and_then(|v| v.parse::<bool>().ok())
    {
        options = options.with_stale_while_revalidate(flag);
    }
    options
}

/// Handler for GET/POST /api/*path
///
/// Serves the upstream resource through the cache.
pub async fn proxy_handler(
    State(state): State<AppState>,
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let url = state.upstream(&path, query.as_deref());

    let mut request = RequestOptions::new().with_method(method.as_str());
    for name in FORWARDED_HEADERS {
        if let Some(value) = header_value(&headers, name) {
            request = request.with_header(name, value);
        }
    }
    if !body.is_empty() {
        let json: Value = serde_json::from_slice(&body)
            .map_err(|e| CacheError::InvalidRequest(format!("Body must be JSON: {}", e)))?;
        request = request.with_body(json);
    }

    let options = cache_options(&headers, state.cache.config().defaults);
    let fetched = state.cache.fetch_entry(&url, &options, &request).await?;

    let mut response = Json(fetched.value.as_ref()).into_response();
    response.headers_mut().insert(
        CACHE_STATUS_HEADER,
        HeaderValue::from_static(fetched.status.as_str()),
    );
    Ok(response)
}

/// Handler for POST /cache/invalidate
///
/// Removes the entry of one upstream request.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    // Validate request
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let (path, query) = match req.path.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (req.path.as_str(), None),
    };
    let url = state.upstream(path, query);
    let removed = state.cache.invalidate(&url, &req.request_options());

    Ok(Json(InvalidateResponse::new(url, removed)))
}

/// Handler for DELETE /cache
///
/// Removes every cached entry.
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    Json(ClearResponse::new(state.cache.clear()))
}

/// Handler for GET /cache/keys
pub async fn keys_handler(State(state): State<AppState>) -> Json<KeysResponse> {
    Json(KeysResponse::new(state.cache.keys()))
}

/// Handler for POST /cache/snapshot
///
/// Writes a snapshot now. Unlike the background export, failures are
/// reported to the caller.
pub async fn snapshot_handler(State(state): State<AppState>) -> Result<Json<SnapshotResponse>> {
    let store = state
        .snapshots
        .clone()
        .ok_or_else(|| CacheError::Persistence("No snapshot store configured".to_string()))?;

    // File I/O runs on the blocking pool
    let cache = state.cache.clone();
    let storage_key = state.snapshot_key.clone();
    let entries = tokio::task::spawn_blocking(move || -> Result<usize> {
        let snapshot = cache.snapshot();
        store.save(&storage_key, &snapshot.to_json()?)?;
        Ok(snapshot.len())
    })
    .await
    .map_err(|e| CacheError::Internal(format!("snapshot task failed: {}", e)))??;

    Ok(Json(SnapshotResponse::new(
        state.snapshot_key.clone(),
        entries,
    )))
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.stats();
    Json(StatsResponse::new(&stats, state.cache.in_flight()))
}

/// Handler for GET /health
///
/// Returns health status of the gateway.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
