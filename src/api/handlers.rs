//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::backend::{FileDriver, MemoryDriver, StorageDriver};
use crate::cache::{CacheWrapper, GetOptions};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    validate_key, CreateStoreRequest, DeleteResponse, GetResponse, HealthResponse, KeysResponse,
    MergeRequest, MergeResponse, MultiGetRequest, MultiGetResponse, PruneResponse,
    RecordsResponse, SetItemRequest, SetResponse, StatsResponse, StoreResponse, StoresResponse,
};
use crate::registry::Registry;

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub registry: Arc<Registry>,
}

impl AppState {
    /// Creates a new AppState around the given registry.
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Uses the file driver when a data directory is configured, the
    /// memory driver otherwise. Stores are created separately.
    pub fn from_config(config: &Config) -> Self {
        let driver: Arc<dyn StorageDriver> = match &config.data_dir {
            Some(dir) => Arc::new(FileDriver::new(dir.clone())),
            None => Arc::new(MemoryDriver::new()),
        };
        let registry = Registry::default();
        registry.define_driver(driver);
        Self::new(registry)
    }

    fn store(&self, store: &str) -> Result<Arc<CacheWrapper>> {
        self.registry
            .get_storage(Some(store))
            .map_err(|_| CacheError::NotFound(format!("Store '{}' not found", store)))
    }
}

fn check_key(key: &str) -> Result<()> {
    match validate_key(key) {
        Some(error_msg) => Err(CacheError::InvalidValue(error_msg)),
        None => Ok(()),
    }
}

/// Query string of GET /stores/:store/records
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordsQuery {
    pub prefer_cache: Option<bool>,
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

// == Store Handlers ==

/// Handler for GET /stores
pub async fn list_stores_handler(State(state): State<AppState>) -> Json<StoresResponse> {
    let mut stores: Vec<StoreResponse> = Vec::new();
    for name in state.registry.store_names() {
        if let Ok(wrapper) = state.registry.get_storage(Some(&name)) {
            stores.push(StoreResponse::from(wrapper.as_ref()));
        }
    }

    Json(StoresResponse {
        namespace: state.registry.namespace().await,
        stores,
    })
}

/// Handler for POST /stores
///
/// Returns the existing store unchanged when the name is already registered.
pub async fn create_store_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateStoreRequest>,
) -> Result<Json<StoreResponse>> {
    let wrapper = state.registry.create_cache_instance(req).await?;
    Ok(Json(StoreResponse::from(wrapper.as_ref())))
}

/// Handler for DELETE /stores/:store
pub async fn drop_store_handler(
    State(state): State<AppState>,
    Path(store): Path<String>,
) -> Result<Json<DeleteResponse>> {
    state.store(&store)?;
    state.registry.drop_cache_instance(Some(&store)).await?;
    Ok(Json(DeleteResponse::store_dropped(store)))
}

/// Handler for GET /stores/:store/keys
pub async fn keys_handler(
    State(state): State<AppState>,
    Path(store): Path<String>,
) -> Result<Json<KeysResponse>> {
    let keys = state.store(&store)?.keys().await?;
    Ok(Json(KeysResponse { store, keys }))
}

/// Handler for GET /stores/:store/records
pub async fn records_handler(
    State(state): State<AppState>,
    Path(store): Path<String>,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<RecordsResponse>> {
    let wrapper = state.store(&store)?;
    let prefer_cache = query.prefer_cache.unwrap_or(wrapper.prefer_cache());
    let records = wrapper.get_records(prefer_cache).await?;
    Ok(Json(RecordsResponse { store, records }))
}

/// Handler for GET /stores/:store/stats
pub async fn stats_handler(
    State(state): State<AppState>,
    Path(store): Path<String>,
) -> Result<Json<StatsResponse>> {
    let stats = state.store(&store)?.stats();
    Ok(Json(StatsResponse::new(store, &stats)))
}

/// Handler for POST /stores/:store/prune
pub async fn prune_handler(
    State(state): State<AppState>,
    Path(store): Path<String>,
) -> Result<Json<PruneResponse>> {
    let report = state.store(&store)?.prune().await?;
    Ok(Json(PruneResponse::new(store, report)))
}

/// Handler for DELETE /stores/:store/items
pub async fn clear_handler(
    State(state): State<AppState>,
    Path(store): Path<String>,
) -> Result<Json<DeleteResponse>> {
    state.store(&store)?.clear().await?;
    Ok(Json(DeleteResponse::store_cleared(store)))
}

/// Handler for POST /stores/:store/multi-get
pub async fn multi_get_handler(
    State(state): State<AppState>,
    Path(store): Path<String>,
    Json(req): Json<MultiGetRequest>,
) -> Result<Json<MultiGetResponse>> {
    let items = state
        .store(&store)?
        .multi_get::<Value, _>(req.keys.as_slice())
        .await?;
    Ok(Json(MultiGetResponse::from(items)))
}

// == Item Handlers ==

/// Handler for GET /stores/:store/items/:key
///
/// Absent and stale records both answer 404.
pub async fn get_item_handler(
    State(state): State<AppState>,
    Path((store, key)): Path<(String, String)>,
) -> Result<Json<GetResponse>> {
    let record = state
        .store(&store)?
        .get_record::<Value>(&key, GetOptions::default())
        .await?
        .ok_or_else(|| CacheError::NotFound(format!("Key '{}' not found", key)))?;

    Ok(Json(GetResponse::from_record(record)))
}

/// Handler for PUT /stores/:store/items/:key
pub async fn set_item_handler(
    State(state): State<AppState>,
    Path((store, key)): Path<(String, String)>,
    Json(req): Json<SetItemRequest>,
) -> Result<Json<SetResponse>> {
    check_key(&key)?;
    let max_age = req.max_age()?;
    state
        .store(&store)?
        .set_item::<Value>(&key, req.value, max_age)
        .await?;

    Ok(Json(SetResponse::new(key)))
}

/// Handler for PATCH /stores/:store/items/:key
pub async fn merge_item_handler(
    State(state): State<AppState>,
    Path((store, key)): Path<(String, String)>,
    Json(req): Json<MergeRequest>,
) -> Result<Json<MergeResponse>> {
    check_key(&key)?;
    let value = state.store(&store)?.merge_item(&key, req.value).await?;
    Ok(Json(MergeResponse::new(key, value)))
}

/// Handler for DELETE /stores/:store/items/:key
pub async fn delete_item_handler(
    State(state): State<AppState>,
    Path((store, key)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>> {
    state.store(&store)?.remove_item(&key).await?;
    Ok(Json(DeleteResponse::new(key)))
}
