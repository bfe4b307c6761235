//! Record Cache - A versioned record cache over pluggable key-value storage
//!
//! Stores values with an optional maxAge and a schema version, serves reads
//! from an in-memory mirror and prunes outdated or stale records.

pub mod api;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod tasks;

pub use api::AppState;
pub use backend::{FileDriver, MemoryDriver, StorageBackend, StorageDriver, StoreScope};
pub use cache::{CacheWrapper, MaxAge, Record, TimeUnit};
pub use config::Config;
pub use error::{CacheError, Result};
pub use registry::{Registry, StoreOptions};
pub use tasks::spawn_prune_task;
