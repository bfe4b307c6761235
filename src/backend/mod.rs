//! Storage Backend Module
//!
//! The durable key-value layer underneath every cache wrapper. A
//! [`StorageDriver`] is chosen by the host application at startup and
//! creates one [`StorageBackend`] per store.

mod file;
mod memory;

use std::fmt::{self, Debug};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;

pub use file::FileDriver;
pub use memory::MemoryDriver;

// == Store Scope ==
/// Identifies one store: the shared namespace plus the store name, along
/// with driver options passed through untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreScope {
    pub namespace: String,
    pub store_name: String,
    pub options: Map<String, Value>,
}

impl StoreScope {
    pub fn new(namespace: impl Into<String>, store_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            store_name: store_name.into(),
            options: Map::new(),
        }
    }

    pub fn with_options(mut self, options: Map<String, Value>) -> Self {
        self.options = options;
        self
    }
}

impl fmt::Display for StoreScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.store_name)
    }
}

// == Storage Backend ==
/// A key-value store already scoped to a single store.
///
/// Values are the plain object form of a record. Every call may suspend and
/// may fail.
#[async_trait]
pub trait StorageBackend: Send + Sync + Debug {
    /// Returns the stored value, `None` when the key is absent.
    async fn get_item(&self, key: &str) -> Result<Option<Value>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set_item(&self, key: &str, value: Value) -> Result<()>;

    /// Removes `key`. Removing an absent key is not an error.
    async fn remove_item(&self, key: &str) -> Result<()>;

    /// All keys of this store.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Removes every key of this store.
    async fn clear(&self) -> Result<()>;
}

// == Storage Driver ==
/// Creates and drops store backends.
#[async_trait]
pub trait StorageDriver: Send + Sync + Debug {
    /// A name for tracing.
    fn name(&self) -> &'static str;

    /// Prepares the backend root. Called once before the first store is created.
    async fn ready(&self) -> Result<()>;

    /// Opens the backend for one store.
    fn create_instance(&self, scope: &StoreScope) -> Result<Arc<dyn StorageBackend>>;

    /// Deletes all data stored under `scope`.
    async fn drop_instance(&self, scope: &StoreScope) -> Result<()>;
}
