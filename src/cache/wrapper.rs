//! Cache Wrapper Module
//!
//! Per-store cache engine: an in-memory mirror of records kept in step with
//! the store's durable backend.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use futures::future::try_join_all;
use parking_lot::{Mutex, RwLock};
use semver::Version;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::backend::StorageBackend;
use crate::cache::expiration::MaxAge;
use crate::cache::merge::{deep_merge, is_mergeable};
use crate::cache::prune::{parse_version, retrieve_and_prune, PruneReport, PruneScan};
use crate::cache::record::{ItemValue, Record, Update};
use crate::cache::stats::CacheStats;
use crate::error::{CacheError, Result};

// == Options ==
/// Read options for [`CacheWrapper::get_record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetOptions {
    /// Return `None` instead of failing when the value is absent or stale
    pub allow_null: bool,
    /// Read from the mirror when it holds the key; `None` uses the store default
    pub prefer_cache: Option<bool>,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self {
            allow_null: true,
            prefer_cache: None,
        }
    }
}

impl GetOptions {
    /// Fails on absent or stale values.
    pub fn required() -> Self {
        Self {
            allow_null: false,
            prefer_cache: None,
        }
    }

    pub fn prefer_cache(mut self, prefer_cache: bool) -> Self {
        self.prefer_cache = Some(prefer_cache);
        self
    }
}

/// Read options for [`CacheWrapper::get_item`].
#[derive(Debug, Clone, PartialEq)]
pub struct GetItemOptions<T> {
    /// Returned when the value is absent or stale; also suppresses the
    /// `allow_null` failure
    pub fallback: Option<T>,
    pub allow_null: bool,
}

impl<T> Default for GetItemOptions<T> {
    fn default() -> Self {
        Self {
            fallback: None,
            allow_null: true,
        }
    }
}

impl<T> GetItemOptions<T> {
    pub fn fallback(value: T) -> Self {
        Self {
            fallback: Some(value),
            allow_null: true,
        }
    }

    pub fn required() -> Self {
        Self {
            fallback: None,
            allow_null: false,
        }
    }
}

/// Changes applied by [`CacheWrapper::update_record`]. Unset fields are left alone.
pub struct RecordUpdate<T> {
    pub value: Option<Update<T>>,
    pub max_age: Option<MaxAge>,
    pub version: Option<String>,
}

impl<T> Default for RecordUpdate<T> {
    fn default() -> Self {
        Self {
            value: None,
            max_age: None,
            version: None,
        }
    }
}

impl<T> RecordUpdate<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(mut self, value: impl Into<Update<T>>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn max_age(mut self, max_age: MaxAge) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// One item of [`CacheWrapper::multi_set`].
pub struct SetEntry<T> {
    pub key: String,
    pub value: ItemValue<T>,
    pub max_age: Option<MaxAge>,
}

impl<T> SetEntry<T> {
    pub fn new(key: impl Into<String>, value: impl Into<ItemValue<T>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            max_age: None,
        }
    }

    pub fn with_max_age(mut self, max_age: MaxAge) -> Self {
        self.max_age = Some(max_age);
        self
    }
}

/// One item of [`CacheWrapper::multi_merge`].
#[derive(Debug, Clone)]
pub struct MergeEntry<T> {
    pub key: String,
    pub value: T,
}

impl<T> MergeEntry<T> {
    pub fn new(key: impl Into<String>, value: T) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Settings fixed when a wrapper is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperSettings {
    pub store_name: String,
    pub version: String,
    pub allow_stale: bool,
    pub prefer_cache: bool,
}

// == Cache Wrapper ==
/// Cache engine for a single store.
///
/// Every successful write lands in the backend first and then in the
/// mirror; every successful remove deletes from both. Stale records are
/// never served, whichever source a read uses.
pub struct CacheWrapper {
    store_name: String,
    version: String,
    allow_stale: bool,
    prefer_cache: bool,
    parsed_version: Version,
    /// In-memory mirror of the backend, keyed by storage key
    cache: RwLock<HashMap<String, Record>>,
    instance: Arc<dyn StorageBackend>,
    stats: Mutex<CacheStats>,
}

impl fmt::Debug for CacheWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheWrapper")
            .field("store_name", &self.store_name)
            .field("version", &self.version)
            .field("allow_stale", &self.allow_stale)
            .field("prefer_cache", &self.prefer_cache)
            .field("entries", &self.cache.read().len())
            .finish()
    }
}

impl CacheWrapper {
    // == Open ==
    /// Prunes the backend and returns a wrapper seeded with the surviving records.
    pub async fn open(instance: Arc<dyn StorageBackend>, settings: WrapperSettings) -> Result<Self> {
        let parsed_version = parse_version(&settings.version)?;
        let PruneScan {
            survivors, report, ..
        } = retrieve_and_prune(instance.as_ref(), &parsed_version, settings.allow_stale).await?;

        info!(
            "Opened store '{}' at version {}: {} records loaded, {} pruned",
            settings.store_name,
            settings.version,
            report.retained,
            report.removed()
        );

        let mut stats = CacheStats::new();
        stats.record_pruned(report.removed());

        Ok(Self {
            store_name: settings.store_name,
            version: settings.version,
            allow_stale: settings.allow_stale,
            prefer_cache: settings.prefer_cache,
            parsed_version,
            cache: RwLock::new(survivors.into_iter().collect()),
            instance,
            stats: Mutex::new(stats),
        })
    }

    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn allow_stale(&self) -> bool {
        self.allow_stale
    }

    pub fn prefer_cache(&self) -> bool {
        self.prefer_cache
    }

    /// The backend this wrapper writes through to.
    pub fn instance(&self) -> &Arc<dyn StorageBackend> {
        &self.instance
    }

    // == Has Item ==
    /// Mirror membership only; the backend is not consulted.
    pub fn has_item(&self, key: &str) -> bool {
        self.cache.read().contains_key(key)
    }

    /// Number of records in the mirror.
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.lock().clone();
        stats.set_total_entries(self.len());
        stats
    }

    // == Get Record ==
    /// Reads a record from the mirror or the backend.
    ///
    /// Absent values return `None`, or fail when `allow_null` is false. A
    /// stale record is removed from mirror and backend before returning
    /// `None` (or failing).
    pub async fn get_record<T: DeserializeOwned>(
        &self,
        key: &str,
        options: GetOptions,
    ) -> Result<Option<Record<T>>> {
        self.read_record(key, options)
            .await?
            .map(Record::into_typed)
            .transpose()
    }

    async fn read_record(&self, key: &str, options: GetOptions) -> Result<Option<Record>> {
        let prefer_cache = options.prefer_cache.unwrap_or(self.prefer_cache);
        let cached = if prefer_cache {
            self.cache.read().get(key).cloned()
        } else {
            None
        };

        let record = match cached {
            Some(record) => {
                self.stats.lock().record_mirror_hit();
                Some(record)
            }
            None => {
                self.stats.lock().record_backend_read();
                match self.instance.get_item(key).await? {
                    None | Some(Value::Null) => None,
                    Some(object) => Some(Record::from_object(object)?),
                }
            }
        };

        let Some(record) = record else {
            self.stats.lock().record_miss();
            if options.allow_null {
                return Ok(None);
            }
            return Err(CacheError::storage(format!(
                "null value returned for key {key}"
            )));
        };

        if record.is_stale() {
            debug!("Evicting stale record {} from '{}'", key, self.store_name);
            self.remove_item(key).await?;
            self.stats.lock().record_stale_eviction();
            if options.allow_null {
                return Ok(None);
            }
            return Err(CacheError::storage(format!(
                "stale value return for key {key}: to resolve this error allowNull when calling getRecord"
            )));
        }

        Ok(Some(record))
    }

    async fn require_record(&self, key: &str) -> Result<Record> {
        self.read_record(key, GetOptions::required())
            .await?
            .ok_or_else(|| CacheError::storage(format!("null value returned for key {key}")))
    }

    // == Get Item ==
    /// Reads the value stored under `key`, or the fallback when there is none.
    pub async fn get_item<T: DeserializeOwned>(
        &self,
        key: &str,
        options: GetItemOptions<T>,
    ) -> Result<Option<T>> {
        let GetItemOptions {
            fallback,
            allow_null,
        } = options;
        let read = GetOptions {
            allow_null: fallback.is_some() || allow_null,
            prefer_cache: None,
        };
        match self.get_record::<T>(key, read).await? {
            Some(record) => Ok(Some(record.value)),
            None => Ok(fallback),
        }
    }

    // == Set Item ==
    /// Stores a new record under `key` at the wrapper's version.
    pub async fn set_item<T: Serialize>(
        &self,
        key: &str,
        value: impl Into<ItemValue<T>>,
        max_age: Option<MaxAge>,
    ) -> Result<()> {
        let record = Record::<T>::new(key, self.version.as_str(), value, max_age)?;
        let record = record
            .into_untyped()
            .map_err(|err| write_error(key, err))?;
        self.write_record(record).await
    }

    async fn write_record(&self, record: Record) -> Result<()> {
        let key = record.key.clone();
        let object = record.to_object().map_err(|err| write_error(&key, err))?;
        self.instance
            .set_item(&key, object)
            .await
            .map_err(|err| write_error(&key, err))?;
        self.cache.write().insert(key, record);
        Ok(())
    }

    // == Remove Item ==
    pub async fn remove_item(&self, key: &str) -> Result<()> {
        self.instance.remove_item(key).await?;
        self.cache.write().remove(key);
        Ok(())
    }

    // == Update Record ==
    /// Applies `update` to an existing record and persists it.
    ///
    /// Fails when the record is absent or stale.
    pub async fn update_record<T>(&self, key: &str, update: RecordUpdate<T>) -> Result<Record<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let RecordUpdate {
            value,
            max_age,
            version,
        } = update;

        let record = self
            .modify_record(key, |record| {
                if let Some(value) = value {
                    let next = match value {
                        Update::Replace(next) => next,
                        Update::With(f) => f(serde_json::from_value(record.value.take())?),
                    };
                    record.set_value(serde_json::to_value(next)?);
                }
                if max_age.is_some() {
                    record.set_expiration(max_age)?;
                }
                if let Some(version) = version {
                    record.version = version;
                }
                Ok(())
            })
            .await?;
        record.into_typed()
    }

    async fn modify_record(
        &self,
        key: &str,
        apply: impl FnOnce(&mut Record) -> Result<()>,
    ) -> Result<Record> {
        let mut record = self.require_record(key).await?;
        apply(&mut record)?;
        self.write_record(record.clone()).await?;
        Ok(record)
    }

    // == Merge Item ==
    /// Deep-merges `value` into the object stored under `key` and returns the result.
    pub async fn merge_item<T>(&self, key: &str, value: T) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let source = serde_json::to_value(value)?;
        if !is_mergeable(&source) {
            return Err(CacheError::storage("merge value must be of typeof object"));
        }

        let merged = self
            .modify_record(key, |record| {
                if !is_mergeable(&record.value) {
                    return Err(CacheError::storage(format!(
                        "stored value for key {key} is not an object"
                    )));
                }
                record.set_value(Update::with(move |target| deep_merge(target, source)));
                Ok(())
            })
            .await
            .map_err(|err| {
                CacheError::storage_caused_by(format!("error merging values for key {key}"), err)
            })?;

        Ok(serde_json::from_value(merged.value)?)
    }

    // == Multi Operations ==
    /// Reads several keys concurrently; results follow the input order.
    pub async fn multi_get<T, K>(&self, keys: &[K]) -> Result<Vec<(String, Option<T>)>>
    where
        T: DeserializeOwned,
        K: AsRef<str>,
    {
        try_join_all(keys.iter().map(|key| async move {
            let key = key.as_ref();
            let value = self.get_item::<T>(key, GetItemOptions::default()).await?;
            Ok::<_, CacheError>((key.to_string(), value))
        }))
        .await
    }

    pub async fn multi_set<T: Serialize>(&self, items: Vec<SetEntry<T>>) -> Result<()> {
        try_join_all(items.into_iter().map(|entry| async move {
            let SetEntry {
                key,
                value,
                max_age,
            } = entry;
            self.set_item::<T>(&key, value, max_age).await
        }))
        .await?;
        Ok(())
    }

    /// Merges several items concurrently; results follow the input order.
    pub async fn multi_merge<T>(&self, items: Vec<MergeEntry<T>>) -> Result<Vec<(String, T)>>
    where
        T: Serialize + DeserializeOwned,
    {
        try_join_all(items.into_iter().map(|entry| async move {
            let merged = self.merge_item(&entry.key, entry.value).await?;
            Ok::<_, CacheError>((entry.key, merged))
        }))
        .await
    }

    pub async fn multi_remove<K: AsRef<str>>(&self, keys: &[K]) -> Result<()> {
        try_join_all(keys.iter().map(|key| self.remove_item(key.as_ref()))).await?;
        Ok(())
    }

    // == Clear ==
    /// Removes every record of this store from backend and mirror.
    pub async fn clear(&self) -> Result<()> {
        self.instance.clear().await?;
        self.cache.write().clear();
        Ok(())
    }

    // == Keys ==
    /// All keys held by the backend.
    pub async fn keys(&self) -> Result<Vec<String>> {
        self.instance.keys().await
    }

    // == Get Records ==
    /// Every live record of the store. Absent and stale entries are skipped.
    pub async fn get_records(&self, prefer_cache: bool) -> Result<Vec<Record>> {
        let keys = self.keys().await?;
        let options = GetOptions::default().prefer_cache(prefer_cache);
        let records = try_join_all(
            keys.iter()
                .map(|key| self.read_record(key, options)),
        )
        .await?;
        Ok(records.into_iter().flatten().collect())
    }

    // == Prune ==
    /// Runs the load-time prune again and drops the removed keys from the mirror.
    ///
    /// Mirror entries written or removed while the scan runs are left as
    /// they are.
    pub async fn prune(&self) -> Result<PruneReport> {
        let PruneScan {
            removed, report, ..
        } = retrieve_and_prune(self.instance.as_ref(), &self.parsed_version, self.allow_stale)
            .await?;
        let removed: HashSet<&str> = removed.iter().map(String::as_str).collect();
        self.cache
            .write()
            .retain(|key, _| !removed.contains(key.as_str()));
        self.stats.lock().record_pruned(report.removed());

        if report.removed() > 0 {
            info!(
                "Pruned store '{}': removed {} records ({} outdated, {} stale, {} invalid)",
                self.store_name,
                report.removed(),
                report.outdated,
                report.stale,
                report.invalid
            );
        }
        Ok(report)
    }
}

fn write_error(key: &str, err: CacheError) -> CacheError {
    CacheError::storage_caused_by(format!("error writing key {key}"), err)
}
