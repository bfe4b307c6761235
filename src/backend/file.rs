//! File storage driver.
//!
//! Each store is one JSON document at `<root>/<namespace>/<store>.json`
//! mapping keys to record objects. Writes go to a temporary file that is
//! then renamed over the document.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{StorageBackend, StorageDriver, StoreScope};
use crate::error::{CacheError, Result};

type Document = BTreeMap<String, Value>;

// == File Driver ==
#[derive(Debug, Clone)]
pub struct FileDriver {
    root: PathBuf,
    /// One lock per document, shared by every backend opened on it
    locks: Arc<parking_lot::Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>>,
}

impl FileDriver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Arc::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, scope: &StoreScope) -> Result<PathBuf> {
        for name in [&scope.namespace, &scope.store_name] {
            if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
                return Err(CacheError::InvalidValue(format!(
                    "invalid store path component {name}"
                )));
            }
        }
        Ok(self
            .root
            .join(&scope.namespace)
            .join(format!("{}.json", scope.store_name)))
    }

    fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .entry(path.to_path_buf())
            .or_default()
            .clone()
    }
}

#[async_trait]
impl StorageDriver for FileDriver {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn ready(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        info!("File storage ready at {}", self.root.display());
        Ok(())
    }

    fn create_instance(&self, scope: &StoreScope) -> Result<Arc<dyn StorageBackend>> {
        let path = self.document_path(scope)?;
        let pretty = scope
            .options
            .get("pretty")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        debug!("Opening file store {} at {}", scope, path.display());
        Ok(Arc::new(FileBackend {
            lock: self.lock_for(&path),
            path,
            pretty,
        }))
    }

    async fn drop_instance(&self, scope: &StoreScope) -> Result<()> {
        let path = self.document_path(scope)?;
        let lock = self.lock_for(&path);
        let _guard = lock.lock().await;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

// == File Backend ==
#[derive(Debug)]
struct FileBackend {
    path: PathBuf,
    pretty: bool,
    lock: Arc<Mutex<()>>,
}

impl FileBackend {
    async fn load(&self) -> Result<Document> {
        match fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(Document::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Document::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, document: &Document) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(document)?
        } else {
            serde_json::to_vec(document)?
        };
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FileBackend {
    async fn get_item(&self, key: &str) -> Result<Option<Value>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(key))
    }

    async fn set_item(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;
        document.insert(key.to_string(), value);
        self.save(&document).await
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;
        if document.remove(key).is_some() {
            self.save(&document).await?;
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.into_keys().collect())
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.save(&Document::new()).await
    }
}
