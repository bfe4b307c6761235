//! Request and Response models for the cache server API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{
    validate_key, CreateStoreRequest, MergeRequest, MultiGetRequest, SetItemRequest,
    MAX_KEY_LENGTH,
};
pub use responses::{
    DeleteResponse, ErrorResponse, GetResponse, HealthResponse, KeysResponse, MergeResponse,
    MultiGetItem, MultiGetResponse, PruneResponse, RecordsResponse, SetResponse, StatsResponse,
    StoreResponse, StoresResponse,
};
