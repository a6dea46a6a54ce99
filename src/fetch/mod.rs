//! Fetch Module
//!
//! The upstream call the cache wraps.

mod http;

pub use http::HttpFetcher;

use async_trait::async_trait;
use serde_json::Value;

use crate::cache::RequestOptions;
use crate::error::Result;

// == Fetch Request ==
/// A fully described upstream request.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub url: String,
    pub options: RequestOptions,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, options: RequestOptions) -> Self {
        Self {
            url: url.into(),
            options,
        }
    }
}

// == Fetcher ==
/// Performs one upstream call and returns its JSON body.
///
/// Implementations must report a non-success status as
/// [`CacheError::Status`](crate::error::CacheError::Status).
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<Value>;
}
