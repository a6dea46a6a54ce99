//! Test doubles shared by the cache unit and property tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Semaphore;

use crate::cache::RequestCache;
use crate::error::{CacheError, Result};
use crate::fetch::{FetchRequest, Fetcher};

/// Fetcher that replays queued responses and counts calls.
///
/// Once the queue is empty every call answers `{"call": n}`. A gated fetcher
/// holds each call until [`ScriptedFetcher::release`] hands out a permit.
#[derive(Debug)]
pub struct ScriptedFetcher {
    calls: AtomicUsize,
    responses: Mutex<VecDeque<Result<Value>>>,
    requests: Mutex<Vec<FetchRequest>>,
    gate: Option<Semaphore>,
}

impl ScriptedFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    pub fn gated() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            gate: Some(Semaphore::new(0)),
        })
    }

    pub fn push_ok(&self, value: Value) {
        self.responses.lock().unwrap().push_back(Ok(value));
    }

    pub fn push_err(&self, err: CacheError) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    pub fn release(&self, permits: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(permits);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<Value> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().unwrap().push(request.clone());

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| CacheError::Internal(e.to_string()))?
                .forget();
        }

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({ "call": call })))
    }
}

pub fn server_error() -> CacheError {
    CacheError::Status {
        status: 500,
        message: "upstream exploded".to_string(),
    }
}

/// Waits until no upstream call is in flight.
pub async fn wait_idle(cache: &RequestCache) {
    wait_until(|| cache.in_flight() == 0).await;
}

/// Polls `condition` every millisecond for up to two seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..2_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("condition not reached in time");
}
