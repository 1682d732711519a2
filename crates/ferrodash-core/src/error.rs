use thiserror::Error;

/// Validation and contract errors exposed by `ferrodash-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("endpoint URL cannot be empty")]
    EmptyEndpoint,

    #[error("header must look like 'Name: value': '{raw}'")]
    InvalidHeader { raw: String },

    #[error("invalid shape '{value}', expected one of time-series, crypto-rates, generic-array, unsupported")]
    InvalidShape { value: String },

    #[error("invalid display mode '{value}', expected one of card, table, chart")]
    InvalidDisplayMode { value: String },

    #[error("relay URL must be an absolute http(s) URL: '{value}'")]
    InvalidRelayUrl { value: String },

    #[error("setting '{name}' must be a non-negative integer: '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}
