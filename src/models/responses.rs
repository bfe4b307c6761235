//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::cache::{CacheStats, CacheWrapper, PruneReport, Record};

/// Formats a Unix millisecond timestamp as RFC 3339.
fn format_timestamp(ms: u64) -> Option<String> {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|dt| dt.to_rfc3339())
}

/// Response body for GET /stores/:store/items/:key
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    pub version: String,
    /// The stored value
    pub value: Value,
    /// Expiration in ISO 8601 format, absent when the record never expires
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

impl GetResponse {
    pub fn from_record(record: Record) -> Self {
        Self {
            expires_at: record.expiration.and_then(format_timestamp),
            key: record.key,
            version: record.version,
            value: record.value,
        }
    }
}

/// Response body for PUT /stores/:store/items/:key
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
}

impl SetResponse {
    /// Creates a new SetResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }
}

/// Response body for PATCH /stores/:store/items/:key
#[derive(Debug, Clone, Serialize)]
pub struct MergeResponse {
    pub key: String,
    /// The value after merging
    pub value: Value,
}

impl MergeResponse {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for item, store and clear deletions
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The key or store that was deleted
    pub key: String,
}

impl DeleteResponse {
    /// Creates a new DeleteResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }

    pub fn store_dropped(store: impl Into<String>) -> Self {
        let store = store.into();
        Self {
            message: format!("Store '{}' dropped successfully", store),
            key: store,
        }
    }

    pub fn store_cleared(store: impl Into<String>) -> Self {
        let store = store.into();
        Self {
            message: format!("Store '{}' cleared successfully", store),
            key: store,
        }
    }
}

/// Response body for POST /stores/:store/multi-get
#[derive(Debug, Clone, Serialize)]
pub struct MultiGetResponse {
    pub items: Vec<MultiGetItem>,
}

/// One entry of [`MultiGetResponse`]; `value` is null for absent keys.
#[derive(Debug, Clone, Serialize)]
pub struct MultiGetItem {
    pub key: String,
    pub value: Option<Value>,
}

impl From<Vec<(String, Option<Value>)>> for MultiGetResponse {
    fn from(items: Vec<(String, Option<Value>)>) -> Self {
        Self {
            items: items
                .into_iter()
                .map(|(key, value)| MultiGetItem { key, value })
                .collect(),
        }
    }
}

/// Response body for GET /stores/:store/stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub store: String,
    pub mirror_hits: u64,
    pub backend_reads: u64,
    pub misses: u64,
    pub stale_evictions: u64,
    pub pruned: u64,
    /// Current number of records in the mirror
    pub total_entries: usize,
    /// Hit rate (mirror_hits / (mirror_hits + backend_reads))
    pub hit_rate: f64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from cache statistics
    pub fn new(store: impl Into<String>, stats: &CacheStats) -> Self {
        Self {
            store: store.into(),
            mirror_hits: stats.mirror_hits,
            backend_reads: stats.backend_reads,
            misses: stats.misses,
            stale_evictions: stats.stale_evictions,
            pruned: stats.pruned,
            total_entries: stats.total_entries,
            hit_rate: stats.mirror_hit_rate(),
        }
    }
}

/// Description of one store
#[derive(Debug, Clone, Serialize)]
pub struct StoreResponse {
    pub store_name: String,
    pub version: String,
    pub allow_stale: bool,
    pub prefer_cache: bool,
    /// Records currently mirrored in memory
    pub entries: usize,
}

impl From<&CacheWrapper> for StoreResponse {
    fn from(wrapper: &CacheWrapper) -> Self {
        Self {
            store_name: wrapper.store_name().to_string(),
            version: wrapper.version().to_string(),
            allow_stale: wrapper.allow_stale(),
            prefer_cache: wrapper.prefer_cache(),
            entries: wrapper.len(),
        }
    }
}

/// Response body for GET /stores
#[derive(Debug, Clone, Serialize)]
pub struct StoresResponse {
    pub namespace: String,
    pub stores: Vec<StoreResponse>,
}

/// Response body for GET /stores/:store/keys
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub store: String,
    pub keys: Vec<String>,
}

/// Response body for GET /stores/:store/records
#[derive(Debug, Clone, Serialize)]
pub struct RecordsResponse {
    pub store: String,
    pub records: Vec<Record>,
}

/// Response body for POST /stores/:store/prune
#[derive(Debug, Clone, Serialize)]
pub struct PruneResponse {
    pub store: String,
    #[serde(flatten)]
    pub report: PruneReport,
    pub removed: usize,
}

impl PruneResponse {
    pub fn new(store: impl Into<String>, report: PruneReport) -> Self {
        Self {
            store: store.into(),
            removed: report.removed(),
            report,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_response_without_expiration() {
        let record: Record = Record::new("k", "1.0.0", json!({"a": 1}), None).unwrap();
        let json = serde_json::to_value(GetResponse::from_record(record)).unwrap();
        assert_eq!(json, json!({"key": "k", "version": "1.0.0", "value": {"a": 1}}));
    }

    #[test]
    fn test_get_response_with_expiration() {
        let mut record: Record = Record::new("k", "1.0.0", json!(1), None).unwrap();
        record.expiration = Some(0);
        let resp = GetResponse::from_record(record);
        assert_eq!(resp.expires_at.as_deref(), Some("1970-01-01T00:00:00+00:00"));
    }

    #[test]
    fn test_set_response_serialize() {
        let resp = SetResponse::new("my_key");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("my_key"));
        assert!(json.contains("successfully"));
    }

    #[test]
    fn test_delete_response_messages() {
        assert!(DeleteResponse::new("k").message.contains("deleted"));
        assert!(DeleteResponse::store_dropped("s").message.contains("dropped"));
        assert!(DeleteResponse::store_cleared("s").message.contains("cleared"));
    }

    #[test]
    fn test_stats_response_hit_rate() {
        let stats = CacheStats {
            mirror_hits: 80,
            backend_reads: 20,
            ..CacheStats::default()
        };
        let resp = StatsResponse::new("s", &stats);
        assert!((resp.hit_rate - 0.8).abs() < 0.001);
    }

    #[test]
    fn test_prune_response_flattens_report() {
        let report = PruneReport {
            retained: 2,
            outdated: 1,
            stale: 1,
            invalid: 0,
        };
        let json = serde_json::to_value(PruneResponse::new("s", report)).unwrap();
        assert_eq!(json["outdated"], 1);
        assert_eq!(json["removed"], 2);
        assert_eq!(json["store"], "s");
    }

    #[test]
    fn test_multi_get_response_keeps_order() {
        let resp = MultiGetResponse::from(vec![
            ("b".to_string(), Some(json!(2))),
            ("a".to_string(), None),
        ]);
        let json = serde_json::to_value(resp).unwrap();
        assert_eq!(
            json,
            json!({"items": [{"key": "b", "value": 2}, {"key": "a", "value": null}]})
        );
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("Something went wrong");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("Something went wrong"));
    }
}
