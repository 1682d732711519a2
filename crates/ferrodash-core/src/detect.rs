//! Structural shape detection.

use std::collections::VecDeque;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// Manifest key carried by Alpha-Vantage-style time series payloads.
pub const META_DATA_KEY: &str = "Meta Data";

/// Time-bucketed data keys, in lookup priority order.
pub const TIME_SERIES_KEYS: [&str; 3] = [
    "Time Series (Daily)",
    "Weekly Time Series",
    "Monthly Time Series",
];

/// Closed set of payload shapes the normalizer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShapeTag {
    TimeSeries,
    CryptoRates,
    GenericArray,
    Unsupported,
}

impl ShapeTag {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TimeSeries => "time-series",
            Self::CryptoRates => "crypto-rates",
            Self::GenericArray => "generic-array",
            Self::Unsupported => "unsupported",
        }
    }
}

impl Display for ShapeTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShapeTag {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "time-series" => Ok(Self::TimeSeries),
            "crypto-rates" => Ok(Self::CryptoRates),
            "generic-array" => Ok(Self::GenericArray),
            "unsupported" => Ok(Self::Unsupported),
            _ => Err(ValidationError::InvalidShape {
                value: value.to_owned(),
            }),
        }
    }
}

/// Classifies a payload by structural signature.
///
/// Rules run in a fixed order and the first match wins: the time series
/// signature needs two co-occurring keys and is checked before the looser
/// crypto signature. This never returns [`ShapeTag::GenericArray`]; see
/// [`classify_payload`] for the array fallback.
pub fn detect_shape(json: &Value) -> ShapeTag {
    let Some(root) = json.as_object() else {
        return ShapeTag::Unsupported;
    };

    let has_meta = root.get(META_DATA_KEY).is_some_and(is_present);
    if has_meta
        && TIME_SERIES_KEYS
            .iter()
            .any(|key| root.get(*key).is_some_and(is_present))
    {
        return ShapeTag::TimeSeries;
    }

    let data = root.get("data");
    let has_currency = data.and_then(|d| d.get("currency")).is_some_and(is_present);
    let has_rates = data.and_then(|d| d.get("rates")).is_some_and(is_present);
    if has_currency && has_rates {
        return ShapeTag::CryptoRates;
    }

    ShapeTag::Unsupported
}

/// Detects the shape and falls back to [`ShapeTag::GenericArray`] when an
/// otherwise unsupported payload holds a table-like array.
pub fn classify_payload(json: &Value) -> ShapeTag {
    match detect_shape(json) {
        ShapeTag::Unsupported if has_tabular_array(json) => ShapeTag::GenericArray,
        shape => shape,
    }
}

/// Returns true when the payload is an array or contains, breadth-first
/// through its objects, a non-empty array whose first item is an object.
pub fn has_tabular_array(json: &Value) -> bool {
    json.is_array() || find_tabular_array(json).is_some()
}

/// Breadth-first search through nested objects for the first non-empty array
/// of objects. Top-level keys are checked before anything nested.
///
/// Returns the dotted path to the array and the array itself.
pub(crate) fn find_tabular_array(json: &Value) -> Option<(String, &Vec<Value>)> {
    let mut queue: VecDeque<(String, &Value)> = VecDeque::new();
    queue.push_back((String::new(), json));

    while let Some((prefix, value)) = queue.pop_front() {
        let Some(map) = value.as_object() else {
            continue;
        };
        for (key, child) in map {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            match child {
                Value::Array(items) if is_table(items) => return Some((path, items)),
                Value::Object(_) => queue.push_back((path, child)),
                _ => {}
            }
        }
    }

    None
}

pub(crate) fn is_table(items: &[Value]) -> bool {
    items.first().is_some_and(Value::is_object)
}

/// Truthiness as the payload producers mean it: `null`, `false`, `0` and
/// empty strings count as absent; containers always count as present.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
