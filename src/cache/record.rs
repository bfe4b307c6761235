//! Record Module
//!
//! Defines the stored unit of the cache: key, schema version, value and
//! optional expiration.

use std::fmt;

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::expiration::{current_timestamp_ms, expiration_from_now, MaxAge};
use crate::error::Result;

// == Item Value ==
/// A value to store, given directly or produced on demand.
pub enum ItemValue<T> {
    Literal(T),
    Producer(Box<dyn FnOnce() -> T + Send>),
}

impl<T> ItemValue<T> {
    /// Defers construction of the value until the record is built.
    pub fn producer(f: impl FnOnce() -> T + Send + 'static) -> Self {
        ItemValue::Producer(Box::new(f))
    }

    pub fn resolve(self) -> T {
        match self {
            ItemValue::Literal(value) => value,
            ItemValue::Producer(produce) => produce(),
        }
    }
}

impl<T> From<T> for ItemValue<T> {
    fn from(value: T) -> Self {
        ItemValue::Literal(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for ItemValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemValue::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            ItemValue::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

// == Update ==
/// A replacement value, or a function deriving the new value from the current one.
pub enum Update<T> {
    Replace(T),
    With(Box<dyn FnOnce(T) -> T + Send>),
}

impl<T> Update<T> {
    pub fn with(f: impl FnOnce(T) -> T + Send + 'static) -> Self {
        Update::With(Box::new(f))
    }
}

impl<T> From<T> for Update<T> {
    fn from(value: T) -> Self {
        Update::Replace(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Update<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Replace(value) => f.debug_tuple("Replace").field(value).finish(),
            Update::With(_) => f.write_str("With(..)"),
        }
    }
}

// == Record ==
/// A cached value with its schema version and optional expiration.
///
/// The serialized form `{key, version, value, expiration}` is exactly what
/// backends persist. `expiration` is omitted when the record never expires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T = Value> {
    pub key: String,
    pub version: String,
    pub value: T,
    /// Expiration timestamp (Unix milliseconds), None = never expires
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_expiration"
    )]
    pub expiration: Option<u64>,
}

/// Accepts fractional timestamps and rounds them to whole milliseconds.
fn deserialize_expiration<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<f64>::deserialize(deserializer)? {
        None => Ok(None),
        Some(ms) if ms.is_finite() && ms >= 0.0 => Ok(Some(ms.round() as u64)),
        Some(ms) => Err(de::Error::custom(format!("invalid expiration {ms}"))),
    }
}

impl<T> Record<T> {
    // == Constructor ==
    /// Creates a record, resolving deferred values and computing expiration.
    pub fn new(
        key: impl Into<String>,
        version: impl Into<String>,
        value: impl Into<ItemValue<T>>,
        max_age: Option<MaxAge>,
    ) -> Result<Self> {
        let mut record = Self {
            key: key.into(),
            version: version.into(),
            value: value.into().resolve(),
            expiration: None,
        };
        record.set_expiration(max_age)?;
        Ok(record)
    }

    // == Is Stale ==
    /// True once the expiration timestamp has passed.
    pub fn is_stale(&self) -> bool {
        match self.expiration {
            Some(expiration) => expiration < current_timestamp_ms(),
            None => false,
        }
    }

    // == Set Expiration ==
    /// Restarts the expiration clock; `None` removes expiration entirely.
    pub fn set_expiration(&mut self, max_age: Option<MaxAge>) -> Result<()> {
        self.expiration = match max_age {
            Some(max_age) => Some(expiration_from_now(max_age)?),
            None => None,
        };
        Ok(())
    }

    // == Set Value ==
    pub fn set_value(&mut self, update: impl Into<Update<T>>)
    where
        T: Default,
    {
        self.value = match update.into() {
            Update::Replace(value) => value,
            Update::With(f) => f(std::mem::take(&mut self.value)),
        };
    }

    /// Remaining lifetime in milliseconds, `Some(0)` once stale.
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expiration
            .map(|expiration| expiration.saturating_sub(current_timestamp_ms()))
    }
}

impl<T: Serialize> Record<T> {
    /// Plain serializable form, the shape every backend stores.
    pub fn to_object(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Converts the payload into an untyped JSON value.
    pub fn into_untyped(self) -> Result<Record<Value>> {
        Ok(Record {
            value: serde_json::to_value(&self.value)?,
            key: self.key,
            version: self.version,
            expiration: self.expiration,
        })
    }
}

impl<T: DeserializeOwned> Record<T> {
    /// Rebuilds a record from its stored form, keeping `expiration` as stored.
    pub fn from_object(object: Value) -> Result<Self> {
        Ok(serde_json::from_value(object)?)
    }
}

impl Record<Value> {
    /// Decodes the JSON payload into a concrete type.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<Record<T>> {
        Ok(Record {
            value: serde_json::from_value(self.value)?,
            key: self.key,
            version: self.version,
            expiration: self.expiration,
        })
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::expiration::TimeUnit;
    use serde_json::json;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_record_creation_no_max_age() {
        let record: Record<String> = Record::new("key", "1.0.0", "value".to_string(), None).unwrap();

        assert_eq!(record.value, "value");
        assert!(record.expiration.is_none());
        assert!(!record.is_stale());
        assert!(record.ttl_remaining_ms().is_none());
    }

    #[test]
    fn test_record_creation_from_producer() {
        let record: Record<Vec<u32>> = Record::new(
            "key",
            "1.0.0",
            ItemValue::producer(|| (1..=3).collect()),
            None,
        )
        .unwrap();

        assert_eq!(record.value, vec![1, 2, 3]);
    }

    #[test]
    fn test_record_expiration_millis() {
        let before = current_timestamp_ms();
        let record: Record<i32> = Record::new("key", "1.0.0", 1, Some(MaxAge::millis(500))).unwrap();
        let after = current_timestamp_ms();

        let expiration = record.expiration.unwrap();
        assert!(expiration >= before + 500 && expiration <= after + 500);
    }

    #[test]
    fn test_record_rejects_invalid_max_age() {
        let err = Record::<i32>::new("key", "1.0.0", 1, Some(MaxAge::millis(0))).unwrap_err();
        assert!(err.is_invalid_value());
    }

    #[test]
    fn test_record_becomes_stale() {
        let record: Record<i32> = Record::new("key", "1.0.0", 1, Some(MaxAge::millis(10))).unwrap();
        assert!(!record.is_stale());

        sleep(Duration::from_millis(30));

        assert!(record.is_stale());
        assert_eq!(record.ttl_remaining_ms(), Some(0));
    }

    #[test]
    fn test_record_past_expiration_is_stale() {
        let mut record: Record<i32> = Record::new("key", "1.0.0", 1, None).unwrap();
        record.expiration = Some(current_timestamp_ms() - 100);
        assert!(record.is_stale());
    }

    #[test]
    fn test_set_value_replace_and_update() {
        let mut record: Record<String> = Record::new("key", "1.0.0", "abc".to_string(), None).unwrap();

        record.set_value("xyz".to_string());
        assert_eq!(record.value, "xyz");

        record.set_value(Update::with(|v: String| v + "123"));
        assert_eq!(record.value, "xyz123");
    }

    #[test]
    fn test_set_expiration_clears_with_none() {
        let mut record: Record<i32> =
            Record::new("key", "1.0.0", 1, Some(MaxAge::span(1, TimeUnit::Day))).unwrap();
        assert!(record.expiration.is_some());

        record.set_expiration(None).unwrap();
        assert!(record.expiration.is_none());
    }

    #[test]
    fn test_to_object_shape() {
        let record: Record = Record::new("key", "1.0.0", json!({"a": 1}), None).unwrap();
        assert_eq!(
            record.to_object().unwrap(),
            json!({"key": "key", "version": "1.0.0", "value": {"a": 1}})
        );
    }

    #[test]
    fn test_from_object_preserves_expiration() {
        let object = json!({"key": "k", "version": "0.5.0", "value": null, "expiration": 42});
        let record: Record = Record::from_object(object).unwrap();

        assert_eq!(record.expiration, Some(42));
        assert_eq!(record.version, "0.5.0");
        assert!(record.value.is_null());
        assert!(record.is_stale());
    }

    #[test]
    fn test_typed_round_trip() {
        let record: Record<Vec<u8>> = Record::new("key", "1.0.0", vec![1u8, 2], None).unwrap();
        let untyped = record.clone().into_untyped().unwrap();
        assert_eq!(untyped.value, json!([1, 2]));

        let typed: Record<Vec<u8>> = untyped.into_typed().unwrap();
        assert_eq!(typed, record);
    }

    #[test]
    fn test_from_object_rounds_fractional_expiration() {
        let record: Record<i32> = Record::from_object(json!({
            "key": "k",
            "version": "1.0.0",
            "value": 1,
            "expiration": 1700000000000.4
        }))
        .unwrap();
        assert_eq!(record.expiration, Some(1_700_000_000_000));

        let record: Record<i32> = Record::from_object(json!({
            "key": "k",
            "version": "1.0.0",
            "value": 1,
            "expiration": 1700000000000.6
        }))
        .unwrap();
        assert_eq!(record.expiration, Some(1_700_000_000_001));
    }

    #[test]
    fn test_from_object_rejects_negative_expiration() {
        let result = Record::<i32>::from_object(json!({
            "key": "k",
            "version": "1.0.0",
            "value": 1,
            "expiration": -5
        }));
        assert!(result.is_err());
    }
}
