//! In-memory storage driver.
//!
//! Data lives for the lifetime of the driver and is shared between every
//! backend opened on the same scope, so closing and reopening a store sees
//! what was written before.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use super::{StorageBackend, StorageDriver, StoreScope};
use crate::error::Result;

type StoreData = Arc<RwLock<BTreeMap<String, Value>>>;

// == Memory Driver ==
#[derive(Debug, Clone, Default)]
pub struct MemoryDriver {
    /// (namespace, store name) -> store contents
    stores: Arc<RwLock<HashMap<(String, String), StoreData>>>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn store_data(&self, scope: &StoreScope) -> StoreData {
        let id = (scope.namespace.clone(), scope.store_name.clone());
        self.stores.write().entry(id).or_default().clone()
    }
}

#[async_trait]
impl StorageDriver for MemoryDriver {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ready(&self) -> Result<()> {
        Ok(())
    }

    fn create_instance(&self, scope: &StoreScope) -> Result<Arc<dyn StorageBackend>> {
        debug!("Opening memory store {}", scope);
        Ok(Arc::new(MemoryBackend {
            data: self.store_data(scope),
        }))
    }

    async fn drop_instance(&self, scope: &StoreScope) -> Result<()> {
        let id = (scope.namespace.clone(), scope.store_name.clone());
        if let Some(data) = self.stores.write().remove(&id) {
            data.write().clear();
        }
        Ok(())
    }
}

// == Memory Backend ==
#[derive(Debug)]
struct MemoryBackend {
    data: StoreData,
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get_item(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.data.read().get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: Value) -> Result<()> {
        self.data.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.data.write().remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.data.read().keys().cloned().collect())
    }

    async fn clear(&self) -> Result<()> {
        self.data.write().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_remove() {
        let driver = MemoryDriver::new();
        let backend = driver.create_instance(&StoreScope::new("ns", "a")).unwrap();

        backend.set_item("k", json!(1)).await.unwrap();
        assert_eq!(backend.get_item("k").await.unwrap(), Some(json!(1)));

        backend.remove_item("k").await.unwrap();
        assert_eq!(backend.get_item("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reopened_instance_sees_data() {
        let driver = MemoryDriver::new();
        let scope = StoreScope::new("ns", "a");

        driver
            .create_instance(&scope)
            .unwrap()
            .set_item("k", json!("v"))
            .await
            .unwrap();

        let reopened = driver.create_instance(&scope).unwrap();
        assert_eq!(reopened.keys().await.unwrap(), vec!["k".to_string()]);
    }

    #[tokio::test]
    async fn test_stores_are_isolated() {
        let driver = MemoryDriver::new();
        let a = driver.create_instance(&StoreScope::new("ns", "a")).unwrap();
        let b = driver.create_instance(&StoreScope::new("ns", "b")).unwrap();

        a.set_item("k", json!(1)).await.unwrap();
        b.set_item("other", json!(2)).await.unwrap();
        a.clear().await.unwrap();

        assert!(a.keys().await.unwrap().is_empty());
        assert_eq!(b.keys().await.unwrap(), vec!["other".to_string()]);
    }

    #[tokio::test]
    async fn test_drop_instance_deletes_data() {
        let driver = MemoryDriver::new();
        let scope = StoreScope::new("ns", "a");
        let backend = driver.create_instance(&scope).unwrap();
        backend.set_item("k", json!(1)).await.unwrap();

        driver.drop_instance(&scope).await.unwrap();

        let reopened = driver.create_instance(&scope).unwrap();
        assert!(reopened.keys().await.unwrap().is_empty());
    }
}
