//! Helpers for projecting upstream payloads onto the curated tool output

use serde_json::{Map, Value};

/// Copy the listed keys that are present in `source`.
pub(crate) fn pick(source: &Value, keys: &[&str]) -> Value {
    let mut out = Map::new();
    for key in keys {
        if let Some(value) = source.get(*key) {
            out.insert((*key).to_string(), value.clone());
        }
    }
    Value::Object(out)
}

/// Map every element of the array at `source[key]`; `null` when absent.
pub(crate) fn map_list(source: &Value, key: &str, f: impl Fn(&Value) -> Value) -> Value {
    match source.get(key).and_then(Value::as_array) {
        Some(items) => Value::Array(items.iter().map(f).collect()),
        None => Value::Null,
    }
}

/// `source[outer][inner]` as a cloned value; `null` when any level is missing.
pub(crate) fn nested(source: &Value, outer: &str, inner: &str) -> Value {
    source
        .get(outer)
        .and_then(|v| v.get(inner))
        .cloned()
        .unwrap_or(Value::Null)
}

/// Pass the upstream `count` through unchanged.
pub(crate) fn count(source: &Value) -> Value {
    source.get("count").cloned().unwrap_or(Value::Null)
}
