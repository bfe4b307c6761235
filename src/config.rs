//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::registry::{
    StoreOptions, DEFAULT_ALLOW_STALE, DEFAULT_NAMESPACE, DEFAULT_PREFER_CACHE,
    DEFAULT_STORE_NAME, DEFAULT_VERSION,
};

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Root name shared by every store
    pub namespace: String,
    /// Stores created at startup
    pub stores: Vec<String>,
    /// Schema version of the records written by this process
    pub version: String,
    /// Keep stale records when pruning
    pub allow_stale: bool,
    /// Serve reads from the in-memory mirror when possible
    pub prefer_cache: bool,
    /// Directory for the file driver; the memory driver is used when unset
    pub data_dir: Option<PathBuf>,
    /// HTTP server port
    pub server_port: u16,
    /// Background prune interval in seconds, 0 disables the task
    pub prune_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_NAMESPACE` - Store namespace (default: RCache)
    /// - `CACHE_STORES` - Comma separated store names (default: defaultCache)
    /// - `CACHE_VERSION` - Record schema version (default: 1.0.0)
    /// - `CACHE_ALLOW_STALE` - Keep stale records on prune (default: false)
    /// - `CACHE_PREFER_CACHE` - Read from the mirror first (default: true)
    /// - `CACHE_DATA_DIR` - Data directory for file storage (default: in-memory)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `PRUNE_INTERVAL` - Prune frequency in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            namespace: env::var("CACHE_NAMESPACE")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.namespace),
            stores: env::var("CACHE_STORES")
                .ok()
                .map(|v| parse_store_list(&v))
                .filter(|stores| !stores.is_empty())
                .unwrap_or(defaults.stores),
            version: env::var("CACHE_VERSION")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.version),
            allow_stale: parse_var("CACHE_ALLOW_STALE").unwrap_or(defaults.allow_stale),
            prefer_cache: parse_var("CACHE_PREFER_CACHE").unwrap_or(defaults.prefer_cache),
            data_dir: env::var_os("CACHE_DATA_DIR")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            prune_interval: parse_var("PRUNE_INTERVAL").unwrap_or(defaults.prune_interval),
        }
    }

    /// Options for every configured store.
    pub fn store_options(&self) -> Vec<StoreOptions> {
        self.stores
            .iter()
            .map(|name| {
                StoreOptions::new(name.as_str())
                    .version(self.version.as_str())
                    .allow_stale(self.allow_stale)
                    .prefer_cache(self.prefer_cache)
                    .namespace(self.namespace.as_str())
            })
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            stores: vec![DEFAULT_STORE_NAME.to_string()],
            version: DEFAULT_VERSION.to_string(),
            allow_stale: DEFAULT_ALLOW_STALE,
            prefer_cache: DEFAULT_PREFER_CACHE,
            data_dir: None,
            server_port: 3000,
            prune_interval: 60,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn parse_store_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
