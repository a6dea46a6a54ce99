//! Request DTOs for the gateway API
//!
//! Defines the structure of incoming HTTP request bodies.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::cache::RequestOptions;

/// Request body for invalidating one cached request (POST /cache/invalidate)
///
/// # Fields
/// - `path`: Upstream path, as used after `/api/` (query string included)
/// - `method`: HTTP method of the cached request (default GET)
/// - `headers`: Key-relevant headers of the cached request
/// - `body`: JSON body of the cached request
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    /// Upstream path
    pub path: String,
    /// Optional HTTP method
    #[serde(default)]
    pub method: Option<String>,
    /// Optional headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Optional JSON body
    #[serde(default)]
    pub body: Option<Value>,
}

impl InvalidateRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.path.trim_start_matches('/').is_empty() {
            return Some("Path cannot be empty".to_string());
        }
        if self.path.contains("://") {
            return Some("Path must be relative to the upstream".to_string());
        }
        None
    }

    /// Rebuilds the request options the cached request was made with.
    pub fn request_options(&self) -> RequestOptions {
        let mut options = RequestOptions {
            body: self.body.clone(),
            ..RequestOptions::default()
        };
        if let Some(method) = &self.method {
            options = options.with_method(method);
        }
        self.headers
            .iter()
            .fold(options, |options, (name, value)| {
                options.with_header(name, value.clone())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_invalidate_request_deserialize() {
        let json = r#"{"path": "products?select=*"}"#;
        let req: InvalidateRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.path, "products?select=*");
        assert!(req.method.is_none());
        assert!(req.headers.is_empty());
        assert!(req.body.is_none());
    }

    #[test]
    fn test_invalidate_request_options() {
        let json = r#"{
            "path": "rpc/shipping_quote",
            "method": "post",
            "headers": {"Authorization": "Bearer t"},
            "body": {"zone": "north"}
        }"#;
        let req: InvalidateRequest = serde_json::from_str(json).unwrap();
        let options = req.request_options();

        assert_eq!(options.method(), "POST");
        assert_eq!(options.headers.get("authorization").unwrap(), "Bearer t");
        assert_eq!(options.body, Some(json!({"zone": "north"})));
    }

    #[test]
    fn test_invalidate_request_validation() {
        let empty = InvalidateRequest {
            path: "/".to_string(),
            method: None,
            headers: BTreeMap::new(),
            body: None,
        };
        assert!(empty.validate().is_some());

        let absolute = InvalidateRequest {
            path: "http://elsewhere/products".to_string(),
            ..empty.clone()
        };
        assert!(absolute.validate().is_some());

        let valid = InvalidateRequest {
            path: "products".to_string(),
            ..empty
        };
        assert!(valid.validate().is_none());
    }
}
