//! Models Module
//!
//! Request and response DTOs for the gateway API.

mod requests;
mod responses;

pub use requests::InvalidateRequest;
pub use responses::{
    ClearResponse, HealthResponse, InvalidateResponse, KeysResponse, SnapshotResponse,
    StatsResponse,
};
