//! Rewriting stored user field values against an edited choice set.
//!
//! Values come in three shapes: a JSON array of keys, a comma-separated list
//! of keys, or a single key. Each key is passed through the rename map and
//! dropped if no longer allowed. The result keeps the shape it came in.

use std::collections::HashSet;

use serde_json::Value;

use crate::choices::RenameMap;

/// Stored shape of a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    Empty,
    JsonList,
    CommaList,
    Scalar,
}

/// Detect the shape of a stored value.
pub fn value_shape(raw: &str) -> ValueShape {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return ValueShape::Empty;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Array(_) | Value::Object(_)) => ValueShape::JsonList,
        _ if trimmed.contains(',') => ValueShape::CommaList,
        _ => ValueShape::Scalar,
    }
}

fn json_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn rename<'a>(key: &'a str, rename_map: &'a RenameMap) -> &'a str {
    rename_map.get(key).map(String::as_str).unwrap_or(key)
}

/// Rename, filter and de-duplicate keys, keeping first occurrences.
fn remap_keys<'a>(
    keys: impl Iterator<Item = &'a str>,
    rename_map: &'a RenameMap,
    allowed: &HashSet<String>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    keys.map(|key| rename(key, rename_map))
        .filter(|key| !key.is_empty() && allowed.contains(*key))
        .filter(|key| seen.insert(*key))
        .map(str::to_string)
        .collect()
}

/// Normalise one stored value. Returns the value that should be stored.
///
/// Comparing the result with the input tells the caller whether a write is
/// needed; an already-normalised value is returned unchanged.
pub fn normalize_value(raw: &str, rename_map: &RenameMap, allowed: &HashSet<String>) -> String {
    let trimmed = raw.trim();

    match value_shape(trimmed) {
        ValueShape::Empty => String::new(),
        ValueShape::JsonList => {
            let items: Vec<String> = match serde_json::from_str::<Value>(trimmed) {
                Ok(Value::Array(items)) => items.iter().map(json_key).collect(),
                Ok(Value::Object(map)) => map.values().map(json_key).collect(),
                _ => Vec::new(),
            };
            let keys = remap_keys(items.iter().map(String::as_str), rename_map, allowed);
            if keys.is_empty() {
                String::new()
            } else {
                Value::from(keys).to_string()
            }
        }
        ValueShape::CommaList => {
            let keys = remap_keys(trimmed.split(',').map(str::trim), rename_map, allowed);
            keys.join(",")
        }
        ValueShape::Scalar => {
            let key = rename(trimmed, rename_map);
            if allowed.contains(key) {
                key.to_string()
            } else {
                String::new()
            }
        }
    }
}
