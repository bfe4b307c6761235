//! Deep Merge Module
//!
//! Recursive merge of JSON values used by `merge_item`.

use serde_json::Value;

/// Merges `source` into `target` recursively.
///
/// Objects are merged key by key and arrays index by index; any other pair
/// resolves to the source value. Keys and indices missing from `source` keep
/// the target's value.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target), Value::Object(source)) => {
            for (key, source_value) in source {
                let merged = match target.remove(&key) {
                    Some(target_value) => deep_merge(target_value, source_value),
                    None => source_value,
                };
                target.insert(key, merged);
            }
            Value::Object(target)
        }
        (Value::Array(mut target), Value::Array(source)) => {
            for (index, source_value) in source.into_iter().enumerate() {
                if index < target.len() {
                    let target_value = std::mem::take(&mut target[index]);
                    target[index] = deep_merge(target_value, source_value);
                } else {
                    target.push(source_value);
                }
            }
            Value::Array(target)
        }
        (_, source) => source,
    }
}

/// True for values a merge can operate on.
pub fn is_mergeable(value: &Value) -> bool {
    value.is_object() || value.is_array()
}
