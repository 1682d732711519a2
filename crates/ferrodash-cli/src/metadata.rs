use std::fmt::{Display, Formatter};

use ferrodash_core::FetchError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

/// Request identifier (UUID v4) attached to every command output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Envelope metadata. Field order is fixed to keep JSON output stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub request_id: RequestId,
    pub generated_at: String,
    pub latency_ms: u64,
    pub from_cache: bool,
    pub warnings: Vec<String>,
}

impl Metadata {
    pub fn new(latency_ms: u64, from_cache: bool) -> Self {
        Self {
            request_id: RequestId::new_v4(),
            generated_at: now_rfc3339(),
            latency_ms,
            from_cache,
            warnings: Vec::new(),
        }
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

/// Error entry of an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvelopeError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

impl EnvelopeError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            status: None,
            retry_after_ms: None,
        }
    }
}

impl From<&FetchError> for EnvelopeError {
    fn from(error: &FetchError) -> Self {
        Self {
            code: error.kind.as_str().to_owned(),
            message: error.message.clone(),
            status: error.status,
            retry_after_ms: error.retry_after,
        }
    }
}

/// Output document of every command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub meta: Metadata,
    pub data: Value,
    pub errors: Vec<EnvelopeError>,
}

impl Envelope {
    pub fn new(meta: Metadata, data: Value, errors: Vec<EnvelopeError>) -> Self {
        Self { meta, data, errors }
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| OffsetDateTime::now_utc().unix_timestamp().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn request_id_is_uuid_v4() {
        let request_id = RequestId::new_v4();
        assert_eq!(request_id.0.get_version_num(), 4);
    }

    #[test]
    fn generated_at_is_rfc3339() {
        let meta = Metadata::new(12, false);
        assert!(OffsetDateTime::parse(&meta.generated_at, &Rfc3339).is_ok());
    }

    #[test]
    fn fetch_errors_map_to_envelope_errors() {
        let error = FetchError::rate_limited(Duration::from_secs(5));

        assert_eq!(
            serde_json::to_value(EnvelopeError::from(&error)).expect("serializes"),
            json!({
                "code": "rate_limit",
                "message": "Rate limit exceeded. Please try again later.",
                "status": 429,
                "retry_after_ms": 5000
            })
        );
    }

    #[test]
    fn envelope_keeps_meta_data_errors_order() {
        let envelope = Envelope::new(Metadata::new(0, true), json!({"k": 1}), Vec::new());

        let rendered = serde_json::to_string(&envelope).expect("serializes");

        let meta_at = rendered.find("\"meta\"").expect("meta key");
        let data_at = rendered.find("\"data\"").expect("data key");
        let errors_at = rendered.find("\"errors\"").expect("errors key");
        assert!(meta_at < data_at && data_at < errors_at);
        assert!(rendered.contains("\"from_cache\":true"));
    }
}
