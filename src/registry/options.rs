//! Store options and their defaults.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::cache::WrapperSettings;

// == Defaults ==
/// Shared root name for all stores when none is configured
pub const DEFAULT_NAMESPACE: &str = "RCache";
/// Store name used when none is given
pub const DEFAULT_STORE_NAME: &str = "defaultCache";
/// Schema version used when none is given
pub const DEFAULT_VERSION: &str = "1.0.0";
pub const DEFAULT_ALLOW_STALE: bool = false;
pub const DEFAULT_PREFER_CACHE: bool = true;

// == Store Options ==
/// Options for creating a store.
///
/// `namespace` only takes effect on the first store created by a registry.
/// Options repeated for an existing store are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreOptions {
    pub store_name: String,
    pub version: String,
    pub allow_stale: bool,
    pub prefer_cache: bool,
    pub namespace: Option<String>,
    /// Passed to the storage driver untouched
    pub driver_options: Map<String, Value>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            store_name: DEFAULT_STORE_NAME.to_string(),
            version: DEFAULT_VERSION.to_string(),
            allow_stale: DEFAULT_ALLOW_STALE,
            prefer_cache: DEFAULT_PREFER_CACHE,
            namespace: None,
            driver_options: Map::new(),
        }
    }
}

impl StoreOptions {
    pub fn new(store_name: impl Into<String>) -> Self {
        Self {
            store_name: store_name.into(),
            ..Self::default()
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn allow_stale(mut self, allow_stale: bool) -> Self {
        self.allow_stale = allow_stale;
        self
    }

    pub fn prefer_cache(mut self, prefer_cache: bool) -> Self {
        self.prefer_cache = prefer_cache;
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn driver_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.driver_options.insert(key.into(), value);
        self
    }

    pub(crate) fn wrapper_settings(&self) -> WrapperSettings {
        WrapperSettings {
            store_name: self.store_name.clone(),
            version: self.version.clone(),
            allow_stale: self.allow_stale,
            prefer_cache: self.prefer_cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let options = StoreOptions::default();
        assert_eq!(options.store_name, "defaultCache");
        assert_eq!(options.version, "1.0.0");
        assert!(!options.allow_stale);
        assert!(options.prefer_cache);
        assert!(options.namespace.is_none());
    }

    #[test]
    fn test_deserialize_partial() {
        let options: StoreOptions =
            serde_json::from_str(r#"{"storeName": "users", "allowStale": true}"#).unwrap();
        assert_eq!(options.store_name, "users");
        assert!(options.allow_stale);
        assert_eq!(options.version, DEFAULT_VERSION);
    }

    #[test]
    fn test_builder() {
        let options = StoreOptions::new("s")
            .version("2.1.0")
            .prefer_cache(false)
            .driver_option("pretty", json!(true));
        assert_eq!(options.version, "2.1.0");
        assert!(!options.prefer_cache);
        assert_eq!(options.driver_options.get("pretty"), Some(&json!(true)));
    }
}
