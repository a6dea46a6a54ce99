//! API Module
//!
//! HTTP handlers and routing for the caching gateway.
//!
//! # Endpoints
//! - `GET|POST /api/*path` - Read-through proxy to the upstream data API
//! - `POST /cache/invalidate` - Drop the entry of one upstream request
//! - `DELETE /cache` - Drop every entry
//! - `GET /cache/keys` - List cached keys
//! - `POST /cache/snapshot` - Export a snapshot now
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
