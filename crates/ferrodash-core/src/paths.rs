//! Field discovery over untyped JSON payloads.
//!
//! [`extract_paths`] walks a payload depth-first and records every addressable
//! leaf (plus every array) as a [`FieldDescriptor`]. [`resolve_path`] is its
//! inverse: given one of those paths it returns the value it points at.
//!
//! Paths use dot segments for object keys and `[n]` suffixes for array
//! indices, e.g. `data.rates.BTC` or `items[0].price`. Arrays are only
//! expanded through their first element; schemas are assumed uniform across
//! items.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Path used for an array payload at the document root.
pub const ROOT_PATH: &str = "root";

const SAMPLE_MAX_CHARS: usize = 50;

/// Runtime type of a discovered field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Null,
    Array,
    Object,
}

impl FieldType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Null => "null",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One addressable location in a JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub path: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub sample: String,
    pub value: Value,
}

impl FieldDescriptor {
    pub const fn is_array(&self) -> bool {
        matches!(self.field_type, FieldType::Array)
    }
}

/// Extracts every discoverable field from `json` in traversal order.
///
/// A `null` or scalar root yields no fields.
pub fn extract_paths(json: &Value) -> Vec<FieldDescriptor> {
    let mut fields = Vec::new();
    match json {
        Value::Array(items) => push_array(&mut fields, ROOT_PATH, "", items),
        Value::Object(map) => walk_object(&mut fields, None, map),
        _ => {}
    }
    fields
}

/// `prefix` is `None` only for the root object; nested keys are always
/// joined with `.`, even when the parent key is empty.
fn walk_object(fields: &mut Vec<FieldDescriptor>, prefix: Option<&str>, map: &Map<String, Value>) {
    for (key, value) in map {
        let path = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key.clone(),
        };

        match value {
            Value::Array(items) => push_array(fields, &path, &path, items),
            Value::Object(child) => walk_object(fields, Some(&path), child),
            scalar => fields.push(FieldDescriptor {
                path,
                field_type: FieldType::of(scalar),
                sample: sample_of(scalar),
                value: scalar.clone(),
            }),
        }
    }
}

/// Records the array itself, then expands its first element when that
/// element is an object. `expansion_prefix` differs from `path` only for the
/// root array, whose items are addressed as `[0].field`.
fn push_array(
    fields: &mut Vec<FieldDescriptor>,
    path: &str,
    expansion_prefix: &str,
    items: &[Value],
) {
    fields.push(FieldDescriptor {
        path: path.to_owned(),
        field_type: FieldType::Array,
        sample: format!("[{} items]", items.len()),
        value: Value::Array(items.to_vec()),
    });

    if let Some(Value::Object(first)) = items.first() {
        walk_object(fields, Some(&format!("{expansion_prefix}[0]")), first);
    }
}

fn sample_of(value: &Value) -> String {
    let rendered = match value {
        Value::String(text) => text.clone(),
        Value::Null => String::from("null"),
        other => other.to_string(),
    };
    rendered.chars().take(SAMPLE_MAX_CHARS).collect()
}

/// Resolves a dot/bracket path against `json`.
///
/// Returns `None` as soon as a segment does not resolve; a missing path is an
/// expected outcome when an upstream API changes after fields were selected.
/// [`ROOT_PATH`] addresses a root array, and an empty path returns the
/// payload itself unless the root object has an empty key.
///
/// Object keys may themselves contain `.` or `[` (Alpha Vantage uses
/// `"1. open"`), so each object level tries every key that prefixes the
/// remaining path and backtracks when the rest of the path fails.
pub fn resolve_path<'a>(json: &'a Value, path: &str) -> Option<&'a Value> {
    match json {
        Value::Array(_) if path == ROOT_PATH => Some(json),
        Value::Object(_) => resolve_key(json, path).or_else(|| path.is_empty().then_some(json)),
        _ if path.is_empty() => Some(json),
        _ => resolve_after(json, path),
    }
}

/// `rest` starts with an object key.
fn resolve_key<'a>(current: &'a Value, rest: &str) -> Option<&'a Value> {
    let map = current.as_object()?;

    // Fast path: the next segment up to a separator is a key.
    let segment_end = rest.find(['.', '[']).unwrap_or(rest.len());
    let segment = &rest[..segment_end];
    if let Some(found) = map
        .get(segment)
        .and_then(|value| resolve_after(value, &rest[segment_end..]))
    {
        return Some(found);
    }

    // Keys containing separators, or an empty key.
    map.iter()
        .filter(|(key, _)| key.as_str() != segment && rest.starts_with(key.as_str()))
        .find_map(|(key, value)| resolve_after(value, &rest[key.len()..]))
}

/// `rest` follows a resolved key or index: empty, `.key…` or `[n]…`.
fn resolve_after<'a>(current: &'a Value, rest: &str) -> Option<&'a Value> {
    if rest.is_empty() {
        return Some(current);
    }
    if let Some(key_path) = rest.strip_prefix('.') {
        return resolve_key(current, key_path);
    }

    let after_bracket = rest.strip_prefix('[')?;
    let close = after_bracket.find(']')?;
    let index = after_bracket[..close].parse::<usize>().ok()?;
    let item = current.as_array()?.get(index)?;
    resolve_after(item, &after_bracket[close + 1..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_root_yields_no_fields() {
        assert!(extract_paths(&Value::Null).is_empty());
    }

    #[test]
    fn nested_objects_produce_dotted_paths() {
        let payload = json!({"data": {"currency": "BTC", "rates": {"USD": "50000"}}});
        let paths: Vec<_> = extract_paths(&payload)
            .into_iter()
            .map(|field| field.path)
            .collect();

        assert_eq!(paths, vec!["data.currency", "data.rates.USD"]);
    }

    #[test]
    fn arrays_are_recorded_once_and_expanded_through_first_item() {
        let payload = json!({"items": [{"price": 1.5, "name": "a"}, {"price": 2, "extra": true}]});
        let fields = extract_paths(&payload);

        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].path, "items");
        assert_eq!(fields[0].field_type, FieldType::Array);
        assert_eq!(fields[0].sample, "[2 items]");
        assert_eq!(fields[1].path, "items[0].price");
        assert_eq!(fields[1].field_type, FieldType::Number);
        assert_eq!(fields[2].path, "items[0].name");
        assert!(fields.iter().all(|field| !field.path.contains("extra")));
    }

    #[test]
    fn arrays_of_scalars_are_not_expanded() {
        let payload = json!({"tags": ["a", "b"], "matrix": [[1, 2]]});
        let fields = extract_paths(&payload);

        assert_eq!(fields.len(), 2);
        assert!(fields.iter().all(FieldDescriptor::is_array));
    }

    #[test]
    fn root_array_uses_root_path_and_indexed_expansion() {
        let payload = json!([{"a": 1}]);
        let fields = extract_paths(&payload);

        assert_eq!(fields[0].path, "root");
        assert_eq!(fields[1].path, "[0].a");
        assert_eq!(resolve_path(&payload, "root"), Some(&payload));
        assert_eq!(resolve_path(&payload, "[0].a"), Some(&json!(1)));
    }

    #[test]
    fn samples_are_truncated_to_fifty_characters() {
        let long = "x".repeat(80);
        let payload = json!({"text": long, "flag": false, "missing": null});
        let fields = extract_paths(&payload);

        assert_eq!(fields[0].sample.chars().count(), 50);
        assert_eq!(fields[1].sample, "false");
        assert_eq!(fields[1].field_type, FieldType::Boolean);
        assert_eq!(fields[2].sample, "null");
        assert_eq!(fields[2].field_type, FieldType::Null);
    }

    #[test]
    fn resolve_handles_keys_with_dots() {
        let payload = json!({"Time Series (Daily)": {"2024-01-02": {"1. open": "1.0"}}});

        assert_eq!(
            resolve_path(&payload, "Time Series (Daily).2024-01-02.1. open"),
            Some(&json!("1.0"))
        );
    }

    #[test]
    fn resolve_returns_none_for_missing_segments() {
        let payload = json!({"data": {"items": [1, 2]}});

        assert!(resolve_path(&payload, "data.nope").is_none());
        assert!(resolve_path(&payload, "data.items[5]").is_none());
        assert!(resolve_path(&payload, "data.items[x]").is_none());
        assert!(resolve_path(&payload, "data.items.length").is_none());
        assert_eq!(resolve_path(&payload, "data.items[1]"), Some(&json!(2)));
    }

    #[test]
    fn empty_and_bracketed_keys_round_trip() {
        let payload = json!({"": 1, "a": {"": 2}, "[0]": 3, "b": {"[1]": {"": [4]}}});
        let paths: Vec<_> = extract_paths(&payload)
            .into_iter()
            .map(|field| field.path)
            .collect();

        assert_eq!(paths, vec!["", "a.", "[0]", "b.[1]."]);
        assert_eq!(resolve_path(&payload, ""), Some(&json!(1)));
        assert_eq!(resolve_path(&payload, "a."), Some(&json!(2)));
        assert_eq!(resolve_path(&payload, "[0]"), Some(&json!(3)));
        assert_eq!(resolve_path(&payload, "b.[1]."), Some(&json!([4])));
        assert_eq!(resolve_path(&payload, "b.[1].[0]"), Some(&json!(4)));
    }

    #[test]
    fn empty_path_without_empty_key_is_the_payload() {
        let payload = json!({"a": 1});

        assert_eq!(resolve_path(&payload, ""), Some(&payload));
    }

    #[test]
    fn every_extracted_path_round_trips() {
        let payload = json!({
            "Meta Data": {"1. Information": "Daily Prices", "2. Symbol": "IBM"},
            "results": [{"id": 1, "tags": [{"k": "v"}], "nested": {"deep": null}}],
            "count": 1,
            "weird.key": {"x[0]": true}
        });

        for field in extract_paths(&payload) {
            assert_eq!(
                resolve_path(&payload, &field.path),
                Some(&field.value),
                "path {} did not round-trip",
                field.path
            );
        }
    }
}
