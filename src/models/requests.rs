//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::Value;

use crate::cache::{MaxAge, RawMaxAge};
use crate::error::Result;
use crate::registry::StoreOptions;

/// Maximum accepted key length
pub const MAX_KEY_LENGTH: usize = 256;

/// Request body for POST /stores
pub type CreateStoreRequest = StoreOptions;

/// Request body for PUT /stores/:store/items/:key
///
/// `maxAge` is either milliseconds or an `[amount, "unit"]` pair.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetItemRequest {
    /// The value to store
    pub value: Value,
    #[serde(default)]
    pub max_age: Option<RawMaxAge>,
}

impl SetItemRequest {
    /// Resolves the wire `maxAge`, rejecting unknown units.
    pub fn max_age(&self) -> Result<Option<MaxAge>> {
        self.max_age.clone().map(MaxAge::try_from).transpose()
    }
}

/// Request body for PATCH /stores/:store/items/:key
#[derive(Debug, Clone, Deserialize)]
pub struct MergeRequest {
    /// Object or array deep-merged into the stored value
    pub value: Value,
}

/// Request body for POST /stores/:store/multi-get
#[derive(Debug, Clone, Deserialize)]
pub struct MultiGetRequest {
    pub keys: Vec<String>,
}

/// Validates a key taken from a request path.
///
/// Returns an error message if validation fails, None if valid.
pub fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} characters",
            MAX_KEY_LENGTH
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TimeUnit;

    #[test]
    fn test_set_request_deserialize() {
        let json = r#"{"value": {"name": "hello"}}"#;
        let req: SetItemRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.value["name"], "hello");
        assert!(req.max_age().unwrap().is_none());
    }

    #[test]
    fn test_set_request_with_max_age() {
        let req: SetItemRequest =
            serde_json::from_str(r#"{"value": 1, "maxAge": 5000}"#).unwrap();
        assert_eq!(req.max_age().unwrap(), Some(MaxAge::Millis(5000.0)));

        let req: SetItemRequest =
            serde_json::from_str(r#"{"value": 1, "maxAge": [2, "hour"]}"#).unwrap();
        assert_eq!(req.max_age().unwrap(), Some(MaxAge::span(2, TimeUnit::Hour)));
    }

    #[test]
    fn test_set_request_unknown_unit() {
        let req: SetItemRequest =
            serde_json::from_str(r#"{"value": 1, "maxAge": [2, "fortnight"]}"#).unwrap();
        assert!(req.max_age().unwrap_err().is_invalid_value());
    }

    #[test]
    fn test_create_store_request() {
        let req: CreateStoreRequest =
            serde_json::from_str(r#"{"storeName": "users", "version": "2.0.0"}"#).unwrap();
        assert_eq!(req.store_name, "users");
        assert_eq!(req.version, "2.0.0");
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("").is_some());
        assert!(validate_key(&"k".repeat(MAX_KEY_LENGTH + 1)).is_some());
        assert!(validate_key("valid_key").is_none());
    }
}
