//! Field discovery and display-mode field selection for widget configuration.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::detect::{classify_payload, ShapeTag};
use crate::error::ValidationError;
use crate::normalize::Metric;
use crate::paths::{extract_paths, FieldDescriptor};

/// How a widget renders its normalized records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Card,
    Table,
    Chart,
}

impl DisplayMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Table => "table",
            Self::Chart => "chart",
        }
    }
}

impl Display for DisplayMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayMode {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "card" => Ok(Self::Card),
            "table" => Ok(Self::Table),
            "chart" => Ok(Self::Chart),
            _ => Err(ValidationError::InvalidDisplayMode {
                value: value.to_owned(),
            }),
        }
    }
}

/// Rejected field selection for a display mode.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("No array fields found in API response. Please select a different API.")]
    NoArrayFields,

    #[error("Selected field must be an array for table view: '{path}'")]
    NotAnArray { path: String },
}

/// Shape and addressable fields of a freshly fetched payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDiscovery {
    pub shape: ShapeTag,
    pub fields: Vec<FieldDescriptor>,
    pub has_arrays: bool,
}

impl FieldDiscovery {
    pub fn array_field_count(&self) -> usize {
        array_field_count(&self.fields)
    }

    pub fn summary(&self) -> String {
        format!(
            "{} fields found ({} arrays), detected shape {}",
            self.fields.len(),
            self.array_field_count(),
            self.shape
        )
    }
}

/// Classifies `json` and lists its fields.
pub fn discover(json: &Value) -> FieldDiscovery {
    if json.is_null() {
        return FieldDiscovery {
            shape: ShapeTag::Unsupported,
            fields: Vec::new(),
            has_arrays: false,
        };
    }

    let fields = extract_paths(json);
    FieldDiscovery {
        shape: classify_payload(json),
        has_arrays: fields.iter().any(FieldDescriptor::is_array),
        fields,
    }
}

pub fn array_field_count(fields: &[FieldDescriptor]) -> usize {
    fields.iter().filter(|field| field.is_array()).count()
}

/// Fields whose path contains `query` (case-insensitive); table mode keeps arrays only.
pub fn filter_fields<'a>(
    fields: &'a [FieldDescriptor],
    query: &str,
    mode: DisplayMode,
) -> Vec<&'a FieldDescriptor> {
    let query = query.to_lowercase();
    fields
        .iter()
        .filter(|field| field.path.to_lowercase().contains(&query))
        .filter(|field| mode != DisplayMode::Table || field.is_array())
        .collect()
}

/// Field list a widget stores for `mode`, filling in defaults when nothing is selected.
pub fn fields_for_display(
    selected: &[String],
    mode: DisplayMode,
    shape: ShapeTag,
    available: &[FieldDescriptor],
) -> Vec<String> {
    if mode == DisplayMode::Chart && shape == ShapeTag::TimeSeries {
        return Metric::ALL.iter().map(|metric| metric.name().to_owned()).collect();
    }
    if !selected.is_empty() {
        return selected.to_vec();
    }
    match mode {
        DisplayMode::Table => available
            .iter()
            .find(|field| field.is_array())
            .map(|field| vec![field.path.clone()])
            .unwrap_or_default(),
        DisplayMode::Card | DisplayMode::Chart => {
            available.iter().map(|field| field.path.clone()).collect()
        }
    }
}

/// Checks that `selected` can be rendered in `mode`.
///
/// Only table mode constrains the selection: the payload must expose an
/// array, and an explicit selection must name one.
pub fn validate_field_selection(
    selected: &[String],
    mode: DisplayMode,
    available: &[FieldDescriptor],
) -> Result<(), SelectionError> {
    if mode != DisplayMode::Table {
        return Ok(());
    }

    match selected.first() {
        None if array_field_count(available) == 0 => Err(SelectionError::NoArrayFields),
        None => Ok(()),
        Some(path) => {
            let is_array = available
                .iter()
                .any(|field| &field.path == path && field.is_array());
            if is_array {
                Ok(())
            } else {
                Err(SelectionError::NotAnArray { path: path.clone() })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> Value {
        json!({
            "status": "ok",
            "trending": {"top": [{"a": 1, "b": "x"}]},
            "tags": ["red", "blue"]
        })
    }

    #[test]
    fn discover_reports_shape_and_arrays() {
        let discovery = discover(&payload());

        assert_eq!(discovery.shape, ShapeTag::GenericArray);
        assert!(discovery.has_arrays);
        assert_eq!(discovery.array_field_count(), 2);
        assert_eq!(discovery.fields[0].path, "status");
    }

    #[test]
    fn discover_null_is_unsupported_and_empty() {
        let discovery = discover(&Value::Null);

        assert_eq!(discovery.shape, ShapeTag::Unsupported);
        assert!(discovery.fields.is_empty());
        assert!(!discovery.has_arrays);
    }

    #[test]
    fn filter_is_case_insensitive_and_table_keeps_arrays() {
        let discovery = discover(&payload());

        let card: Vec<&str> = filter_fields(&discovery.fields, "TOP", DisplayMode::Card)
            .into_iter()
            .map(|field| field.path.as_str())
            .collect();
        assert_eq!(card, ["trending.top", "trending.top[0].a", "trending.top[0].b"]);

        let table: Vec<&str> = filter_fields(&discovery.fields, "", DisplayMode::Table)
            .into_iter()
            .map(|field| field.path.as_str())
            .collect();
        assert_eq!(table, ["trending.top", "tags"]);
    }

    #[test]
    fn chart_over_time_series_uses_ohlcv() {
        let fields = fields_for_display(&[], DisplayMode::Chart, ShapeTag::TimeSeries, &[]);

        assert_eq!(fields, ["open", "high", "low", "close", "volume"]);
    }

    #[test]
    fn empty_selection_defaults_per_mode() {
        let discovery = discover(&payload());

        let table = fields_for_display(&[], DisplayMode::Table, discovery.shape, &discovery.fields);
        assert_eq!(table, ["trending.top"]);

        let card = fields_for_display(&[], DisplayMode::Card, discovery.shape, &discovery.fields);
        assert_eq!(card.len(), discovery.fields.len());

        let explicit = vec![String::from("status")];
        assert_eq!(
            fields_for_display(&explicit, DisplayMode::Card, discovery.shape, &discovery.fields),
            explicit
        );
    }

    #[test]
    fn table_selection_must_name_an_array() {
        let discovery = discover(&payload());

        assert_eq!(
            validate_field_selection(&[], DisplayMode::Table, &discovery.fields),
            Ok(())
        );
        assert_eq!(
            validate_field_selection(&[String::from("tags")], DisplayMode::Table, &discovery.fields),
            Ok(())
        );
        assert_eq!(
            validate_field_selection(&[String::from("status")], DisplayMode::Table, &discovery.fields),
            Err(SelectionError::NotAnArray {
                path: String::from("status")
            })
        );
        assert_eq!(
            validate_field_selection(&[String::from("status")], DisplayMode::Card, &discovery.fields),
            Ok(())
        );
    }

    #[test]
    fn table_needs_some_array_in_payload() {
        let discovery = discover(&json!({"price": 1.5}));

        assert_eq!(
            validate_field_selection(&[], DisplayMode::Table, &discovery.fields),
            Err(SelectionError::NoArrayFields)
        );
    }

    #[test]
    fn display_mode_parses_case_insensitively() {
        assert_eq!("Table".parse::<DisplayMode>(), Ok(DisplayMode::Table));
        assert!("grid".parse::<DisplayMode>().is_err());
    }
}
