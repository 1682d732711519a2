//! Conversion of detected payloads into renderer-ready records.
//!
//! Every branch is total over structurally valid JSON: malformed or
//! unrecognized input produces [`NormalizedResult::Error`] rather than a
//! panic, so a refresh loop can show the message in place and keep going.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::detect::{classify_payload, find_tabular_array, is_table, ShapeTag, META_DATA_KEY, TIME_SERIES_KEYS};
use crate::paths::{resolve_path, ROOT_PATH};

pub const UNSUPPORTED_FORMAT: &str = "Unsupported API format";
pub const NO_ARRAY_DATA: &str = "No array data found";

/// Shape-specific normalized output, or an in-place error message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NormalizedResult {
    Records(ShapedRecords),
    Error { error: String },
}

impl NormalizedResult {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error { error } => Some(error.as_str()),
            Self::Records(_) => None,
        }
    }

    pub fn records(&self) -> Option<&ShapedRecords> {
        match self {
            Self::Records(records) => Some(records),
            Self::Error { .. } => None,
        }
    }
}

/// Records for each normalizable shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ShapedRecords {
    TimeSeries {
        meta: Value,
        data: Vec<TimeSeriesPoint>,
    },
    CryptoRates {
        currency: String,
        rates: Vec<RateEntry>,
    },
    GenericArray {
        #[serde(rename = "arrayPath")]
        array_path: String,
        columns: Vec<String>,
        data: Vec<Value>,
    },
}

impl ShapedRecords {
    pub const fn shape(&self) -> ShapeTag {
        match self {
            Self::TimeSeries { .. } => ShapeTag::TimeSeries,
            Self::CryptoRates { .. } => ShapeTag::CryptoRates,
            Self::GenericArray { .. } => ShapeTag::GenericArray,
        }
    }
}

/// One dated OHLCV row. Only selected metrics are populated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

/// A single `{symbol, value}` pair from a rates map. `value` is passed through
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateEntry {
    pub symbol: String,
    pub value: Value,
}

/// OHLCV metrics of a time series bucket entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Open,
        Metric::High,
        Metric::Low,
        Metric::Close,
        Metric::Volume,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::High => "high",
            Self::Low => "low",
            Self::Close => "close",
            Self::Volume => "volume",
        }
    }

    const fn source_key(self) -> &'static str {
        match self {
            Self::Open => "1. open",
            Self::High => "2. high",
            Self::Low => "3. low",
            Self::Close => "4. close",
            Self::Volume => "5. volume",
        }
    }

    /// A selection entry picks a metric when the text after its last `.` is
    /// the metric name. `close`, `4. close` and a full discovered path all
    /// select `close`; `x.below` selects nothing.
    fn selected_by(self, field: &str) -> bool {
        let last = field.rsplit('.').next().unwrap_or(field);
        last.trim().eq_ignore_ascii_case(self.name())
    }

    fn assign(self, point: &mut TimeSeriesPoint, value: f64) {
        let slot = match self {
            Self::Open => &mut point.open,
            Self::High => &mut point.high,
            Self::Low => &mut point.low,
            Self::Close => &mut point.close,
            Self::Volume => &mut point.volume,
        };
        *slot = Some(value);
    }
}

/// Normalizes `json` according to `shape`.
pub fn normalize(json: &Value, shape: ShapeTag, selected_fields: &[String]) -> NormalizedResult {
    if json.is_null() {
        return NormalizedResult::error(UNSUPPORTED_FORMAT);
    }

    match shape {
        ShapeTag::TimeSeries => normalize_time_series(json, selected_fields),
        ShapeTag::CryptoRates => normalize_crypto_rates(json),
        ShapeTag::GenericArray => normalize_generic_array(json, selected_fields),
        ShapeTag::Unsupported => NormalizedResult::error(UNSUPPORTED_FORMAT),
    }
}

/// Classifies the payload (with the generic array fallback) and normalizes it.
pub fn normalize_payload(json: &Value, selected_fields: &[String]) -> (ShapeTag, NormalizedResult) {
    let shape = classify_payload(json);
    (shape, normalize(json, shape, selected_fields))
}

fn normalize_time_series(json: &Value, selected_fields: &[String]) -> NormalizedResult {
    let empty = Map::new();
    let bucket = TIME_SERIES_KEYS
        .iter()
        .filter_map(|key| json.get(*key).and_then(Value::as_object))
        .find(|bucket| !bucket.is_empty())
        .unwrap_or(&empty);

    let metrics: Vec<Metric> = if selected_fields.is_empty() {
        Metric::ALL.to_vec()
    } else {
        Metric::ALL
            .into_iter()
            .filter(|metric| selected_fields.iter().any(|field| metric.selected_by(field)))
            .collect()
    };

    let mut dates: Vec<&String> = bucket.keys().collect();
    dates.sort();

    let data = dates
        .into_iter()
        .map(|date| {
            let entry = &bucket[date.as_str()];
            let mut point = TimeSeriesPoint {
                date: date.clone(),
                ..TimeSeriesPoint::default()
            };
            for metric in &metrics {
                metric.assign(&mut point, coerce_number(entry.get(metric.source_key())));
            }
            point
        })
        .collect();

    let meta = json
        .get(META_DATA_KEY)
        .filter(|meta| meta.is_object())
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));

    NormalizedResult::Records(ShapedRecords::TimeSeries { meta, data })
}

/// Missing or non-numeric values become `0.0` so downstream arithmetic never
/// sees NaN. This masks bad upstream data.
fn coerce_number(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite()).unwrap_or(0.0)
}

fn normalize_crypto_rates(json: &Value) -> NormalizedResult {
    let data = json.get("data");

    let currency = match data.and_then(|d| d.get("currency")) {
        Some(Value::String(currency)) => currency.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    let rates = data
        .and_then(|d| d.get("rates"))
        .and_then(Value::as_object)
        .map(|rates| {
            rates
                .iter()
                .map(|(symbol, value)| RateEntry {
                    symbol: symbol.clone(),
                    value: value.clone(),
                })
                .collect()
        })
        .unwrap_or_default();

    NormalizedResult::Records(ShapedRecords::CryptoRates { currency, rates })
}

fn normalize_generic_array(json: &Value, selected_fields: &[String]) -> NormalizedResult {
    let located = match json {
        Value::Array(items) => Some((String::from(ROOT_PATH), items)),
        _ => selected_array(json, selected_fields).or_else(|| find_tabular_array(json)),
    };

    let Some((array_path, items)) = located else {
        return NormalizedResult::error(NO_ARRAY_DATA);
    };

    let columns = match items.first() {
        Some(Value::Object(first)) => first
            .iter()
            .filter(|(_, value)| !value.is_object() && !value.is_array())
            .map(|(key, _)| key.clone())
            .collect(),
        _ => Vec::new(),
    };

    NormalizedResult::Records(ShapedRecords::GenericArray {
        array_path,
        columns,
        data: items.clone(),
    })
}

/// Table widgets store the chosen array's path as their selection.
fn selected_array<'a>(json: &'a Value, selected_fields: &[String]) -> Option<(String, &'a Vec<Value>)> {
    selected_fields.iter().find_map(|path| match resolve_path(json, path) {
        Some(Value::Array(items)) if is_table(items) => Some((path.clone(), items)),
        _ => None,
    })
}
