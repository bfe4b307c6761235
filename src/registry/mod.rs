//! Registry Module
//!
//! Creates, hands out and drops the cache wrappers of a process, one per
//! store name, all living under a shared namespace.

mod options;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::try_join_all;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::backend::{MemoryDriver, StorageDriver, StoreScope};
use crate::cache::{CacheWrapper, PruneReport};
use crate::error::{CacheError, Result};

pub use options::{
    StoreOptions, DEFAULT_ALLOW_STALE, DEFAULT_NAMESPACE, DEFAULT_PREFER_CACHE,
    DEFAULT_STORE_NAME, DEFAULT_VERSION,
};

#[derive(Debug)]
struct RegistryState {
    /// Whether the driver root has been prepared
    init: bool,
    namespace: String,
}

impl Default for RegistryState {
    fn default() -> Self {
        Self {
            init: false,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

#[derive(Debug)]
struct DriverSlot {
    driver: Arc<dyn StorageDriver>,
    /// Whether a host driver has been installed through `define_driver`
    defined: bool,
}

// == Registry ==
/// Process-wide set of cache wrappers keyed by store name.
///
/// Store creation is first-call-wins: once a store exists, later requests
/// for the same name get the existing wrapper and their options are ignored.
pub struct Registry {
    driver: RwLock<DriverSlot>,
    state: Mutex<RegistryState>,
    wrappers: RwLock<HashMap<String, Arc<CacheWrapper>>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("driver", &self.driver.read().driver.name())
            .field("stores", &self.store_names())
            .finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(Arc::new(MemoryDriver::new()))
    }
}

impl Registry {
    // == Constructor ==
    pub fn new(driver: Arc<dyn StorageDriver>) -> Self {
        Self {
            driver: RwLock::new(DriverSlot {
                driver,
                defined: false,
            }),
            state: Mutex::new(RegistryState::default()),
            wrappers: RwLock::new(HashMap::new()),
        }
    }

    // == Define Driver ==
    /// Installs a host-selected storage driver. Only the first call takes
    /// effect; returns whether this call installed the driver.
    pub fn define_driver(&self, driver: Arc<dyn StorageDriver>) -> bool {
        let mut slot = self.driver.write();
        if slot.defined {
            warn!(
                "Storage driver already defined as '{}', ignoring '{}'",
                slot.driver.name(),
                driver.name()
            );
            return false;
        }
        info!("Using storage driver '{}'", driver.name());
        slot.driver = driver;
        slot.defined = true;
        true
    }

    pub fn driver(&self) -> Arc<dyn StorageDriver> {
        self.driver.read().driver.clone()
    }

    pub async fn namespace(&self) -> String {
        self.state.lock().await.namespace.clone()
    }

    /// Prepares the driver root on first use and returns the namespace.
    async fn ensure_ready(&self, namespace: Option<&str>) -> Result<String> {
        let mut state = self.state.lock().await;
        if !state.init {
            if let Some(namespace) = namespace {
                state.namespace = namespace.to_string();
            }
            self.driver().ready().await?;
            state.init = true;
            info!("Cache namespace '{}' ready", state.namespace);
        }
        Ok(state.namespace.clone())
    }

    // == Create Cache Instance ==
    /// Returns the wrapper for `options.store_name`, creating it on first use.
    ///
    /// Creation opens the store's backend and prunes it: records with an
    /// older version are deleted, as are stale records unless
    /// `allow_stale` is set. Prune failures fail the creation.
    pub async fn create_cache_instance(&self, options: StoreOptions) -> Result<Arc<CacheWrapper>> {
        if options.store_name.is_empty() {
            return Err(invalid_store_name(&options.store_name));
        }
        let namespace = self.ensure_ready(options.namespace.as_deref()).await?;

        let existing = self.wrappers.read().get(&options.store_name).cloned();
        if let Some(existing) = existing {
            return Ok(existing);
        }

        let scope = StoreScope::new(namespace, options.store_name.as_str())
            .with_options(options.driver_options.clone());
        let instance = self.driver().create_instance(&scope)?;
        let wrapper = Arc::new(CacheWrapper::open(instance, options.wrapper_settings()).await?);

        let wrapper = self
            .wrappers
            .write()
            .entry(options.store_name)
            .or_insert(wrapper)
            .clone();
        Ok(wrapper)
    }

    // == Drop Cache Instance ==
    /// Deletes all data of a store and forgets its wrapper.
    pub async fn drop_cache_instance(&self, store_name: Option<&str>) -> Result<()> {
        let store_name = store_name.unwrap_or(DEFAULT_STORE_NAME);
        if !self.wrappers.read().contains_key(store_name) {
            return Err(invalid_store_name(store_name));
        }

        let namespace = self.namespace().await;
        self.driver()
            .drop_instance(&StoreScope::new(namespace, store_name))
            .await?;
        self.wrappers.write().remove(store_name);
        info!("Dropped store '{}'", store_name);
        Ok(())
    }

    // == Cache Factory ==
    /// Ensures the given stores exist (the default store when `None`),
    /// creating them concurrently, and returns every registered wrapper.
    pub async fn cache_factory(
        &self,
        configs: Option<Vec<StoreOptions>>,
    ) -> Result<HashMap<String, Arc<CacheWrapper>>> {
        match configs {
            None => {
                self.create_cache_instance(StoreOptions::default()).await?;
            }
            Some(configs) => {
                try_join_all(
                    configs
                        .into_iter()
                        .map(|options| self.create_cache_instance(options)),
                )
                .await?;
            }
        }
        Ok(self.wrappers.read().clone())
    }

    // == Get Storage ==
    pub fn get_storage(&self, store_name: Option<&str>) -> Result<Arc<CacheWrapper>> {
        let store_name = store_name.unwrap_or(DEFAULT_STORE_NAME);
        self.wrappers
            .read()
            .get(store_name)
            .cloned()
            .ok_or_else(|| invalid_store_name(store_name))
    }

    /// Registered store names, sorted.
    pub fn store_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.wrappers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Prunes every registered store.
    pub async fn prune_all(&self) -> Result<Vec<(String, PruneReport)>> {
        let wrappers: Vec<Arc<CacheWrapper>> = self.wrappers.read().values().cloned().collect();
        let mut reports = Vec::with_capacity(wrappers.len());
        for wrapper in wrappers {
            let report = wrapper.prune().await?;
            reports.push((wrapper.store_name().to_string(), report));
        }
        Ok(reports)
    }

    // == Reset ==
    /// Forgets every wrapper and returns the registry to its initial state.
    /// Stored data is left untouched.
    pub async fn reset(&self) {
        *self.state.lock().await = RegistryState::default();
        self.wrappers.write().clear();
        self.driver.write().defined = false;
    }
}

fn invalid_store_name(store_name: &str) -> CacheError {
    CacheError::InvalidValue(format!("invalid storeName {store_name}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{GetItemOptions, MaxAge};
    use std::time::Duration;

    #[tokio::test]
    async fn test_default_settings() {
        let registry = Registry::default();
        let wrapper = registry
            .create_cache_instance(StoreOptions::default())
            .await
            .unwrap();

        assert_eq!(wrapper.store_name(), DEFAULT_STORE_NAME);
        assert_eq!(wrapper.version(), "1.0.0");
        assert!(!wrapper.allow_stale());
        assert!(wrapper.prefer_cache());
        assert_eq!(registry.namespace().await, DEFAULT_NAMESPACE);
    }

    #[tokio::test]
    async fn test_custom_settings() {
        let registry = Registry::default();
        let wrapper = registry
            .create_cache_instance(
                StoreOptions::new("custom")
                    .version("2.0.0")
                    .allow_stale(true)
                    .prefer_cache(false),
            )
            .await
            .unwrap();

        assert_eq!(wrapper.store_name(), "custom");
        assert_eq!(wrapper.version(), "2.0.0");
        assert!(wrapper.allow_stale());
        assert!(!wrapper.prefer_cache());
    }

    #[tokio::test]
    async fn test_namespace_settable_once() {
        let registry = Registry::default();
        registry
            .create_cache_instance(StoreOptions::new("a").namespace("first"))
            .await
            .unwrap();
        registry
            .create_cache_instance(StoreOptions::new("b").namespace("second"))
            .await
            .unwrap();

        assert_eq!(registry.namespace().await, "first");
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let registry = Registry::default();
        let first = registry
            .create_cache_instance(StoreOptions::new("s"))
            .await
            .unwrap();
        let second = registry
            .create_cache_instance(StoreOptions::new("s").version("9.0.0"))
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.version(), "1.0.0");
    }

    #[tokio::test]
    async fn test_get_storage() {
        let registry = Registry::default();
        let err = registry.get_storage(Some("nope")).unwrap_err();
        assert!(err.is_invalid_value());
        assert_eq!(err.to_string(), "invalid storeName nope");

        let created = registry
            .create_cache_instance(StoreOptions::default())
            .await
            .unwrap();
        let fetched = registry.get_storage(None).unwrap();
        assert!(Arc::ptr_eq(&created, &fetched));
    }

    #[tokio::test]
    async fn test_drop_cache_instance() {
        let registry = Registry::default();
        let err = registry.drop_cache_instance(None).await.unwrap_err();
        assert_eq!(err.to_string(), "invalid storeName defaultCache");

        let wrapper = registry
            .create_cache_instance(StoreOptions::default())
            .await
            .unwrap();
        wrapper.set_item("k", 1, None).await.unwrap();

        registry.drop_cache_instance(None).await.unwrap();
        assert!(registry.get_storage(None).is_err());

        let recreated = registry
            .create_cache_instance(StoreOptions::default())
            .await
            .unwrap();
        assert!(recreated.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cache_factory() {
        let registry = Registry::default();
        let stores = registry.cache_factory(None).await.unwrap();
        assert_eq!(stores.len(), 1);
        assert!(stores.contains_key(DEFAULT_STORE_NAME));

        let stores = registry
            .cache_factory(Some(vec![StoreOptions::new("a"), StoreOptions::new("b")]))
            .await
            .unwrap();
        assert_eq!(stores.len(), 3);
        assert_eq!(registry.store_names(), vec!["a", "b", DEFAULT_STORE_NAME]);
    }

    #[tokio::test]
    async fn test_define_driver_once() {
        let registry = Registry::default();
        assert!(registry.define_driver(Arc::new(MemoryDriver::new())));
        assert!(!registry.define_driver(Arc::new(MemoryDriver::new())));

        registry.reset().await;
        assert!(registry.define_driver(Arc::new(MemoryDriver::new())));
    }

    #[tokio::test]
    async fn test_reset_keeps_data() {
        let registry = Registry::default();
        let wrapper = registry
            .create_cache_instance(StoreOptions::default())
            .await
            .unwrap();
        wrapper.set_item("k", "v", None).await.unwrap();

        registry.reset().await;
        assert!(registry.store_names().is_empty());

        let reopened = registry
            .create_cache_instance(StoreOptions::default())
            .await
            .unwrap();
        assert!(!Arc::ptr_eq(&wrapper, &reopened));
        let value: Option<String> = reopened
            .get_item("k", GetItemOptions::default())
            .await
            .unwrap();
        assert_eq!(value.as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_prune_all() {
        let registry = Registry::default();
        let wrapper = registry
            .create_cache_instance(StoreOptions::default())
            .await
            .unwrap();
        wrapper
            .set_item("short", 1, Some(MaxAge::millis(5)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let reports = registry.prune_all().await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].1.stale, 1);
        assert!(!wrapper.has_item("short"));
    }

    #[tokio::test]
    async fn test_rejects_empty_store_name() {
        let registry = Registry::default();
        let err = registry
            .create_cache_instance(StoreOptions::new(""))
            .await
            .unwrap_err();
        assert!(err.is_invalid_value());
    }
}
