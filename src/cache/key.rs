//! Request Key Module
//!
//! Describes the request-shaping options and derives the canonical cache key
//! from them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP method used when none is given.
pub const DEFAULT_METHOD: &str = "GET";

// == Request Options ==
/// Method, headers and body of a request.
///
/// All three take part in key derivation, so the same URL fetched with a
/// different method, header set or body is cached independently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
    /// HTTP method, upper case. `None` means `GET`.
    #[serde(default)]
    pub method: Option<String>,
    /// Request headers, names lower case
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// JSON request body
    #[serde(default)]
    pub body: Option<Value>,
}

impl RequestOptions {
    /// Creates options for a plain `GET`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP method.
    pub fn with_method(mut self, method: impl AsRef<str>) -> Self {
        self.method = Some(method.as_ref().to_ascii_uppercase());
        self
    }

    /// Adds a header. Names are case-insensitive and stored lower case.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Sets the JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Returns the effective method.
    pub fn method(&self) -> String {
        self.method
            .as_deref()
            .map(str::to_ascii_uppercase)
            .unwrap_or_else(|| DEFAULT_METHOD.to_string())
    }
}

// == Key Derivation ==
/// Builds the canonical key `METHOD:url:headers:body`.
///
/// Headers are serialized as a JSON object with lower-cased, sorted names and
/// the body as compact JSON with sorted object keys, so two requests that
/// differ only in header insertion order or body key order share a key.
pub fn derive_key(url: &str, request: &RequestOptions) -> String {
    let headers: serde_json::Map<String, Value> = request
        .headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), Value::String(value.clone())))
        .collect();
    let body = request
        .body
        .as_ref()
        .map(Value::to_string)
        .unwrap_or_default();

    format!(
        "{}:{}:{}:{}",
        request.method(),
        url,
        Value::Object(headers),
        body
    )
}
