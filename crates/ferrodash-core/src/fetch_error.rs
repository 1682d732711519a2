//! Closed error taxonomy surfaced to fetch callers.
//!
//! | Kind | Trigger |
//! |------|---------|
//! | `rate_limit` | HTTP 429, carries `retryAfter` in milliseconds |
//! | `auth_error` | HTTP 401 |
//! | `permission_error` | HTTP 403 |
//! | `not_found` | HTTP 404 |
//! | `server_error` | HTTP 5xx |
//! | `http_error` | any other non-2xx |
//! | `network_error` | transport or body parse failure before a usable status |
//! | `unknown_error` | unexpected failure while preparing the request |

use std::fmt::{Display, Formatter};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::http_client::{HttpError, HttpErrorKind};

/// Error classification by HTTP status or failure stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    RateLimit,
    AuthError,
    PermissionError,
    NotFound,
    ServerError,
    HttpError,
    NetworkError,
    UnknownError,
}

impl FetchErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RateLimit => "rate_limit",
            Self::AuthError => "auth_error",
            Self::PermissionError => "permission_error",
            Self::NotFound => "not_found",
            Self::ServerError => "server_error",
            Self::HttpError => "http_error",
            Self::NetworkError => "network_error",
            Self::UnknownError => "unknown_error",
        }
    }

    /// Maps a non-2xx status to its kind.
    pub const fn from_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimit,
            401 => Self::AuthError,
            403 => Self::PermissionError,
            404 => Self::NotFound,
            500..=599 => Self::ServerError,
            _ => Self::HttpError,
        }
    }
}

impl Display for FetchErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed, serializable fetch failure.
///
/// Serializes as `{ message, type, retryAfter?, status?, details? }`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
#[serde(rename_all = "camelCase")]
pub struct FetchError {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: FetchErrorKind,
    /// Milliseconds until the endpoint may be retried. Only set for `rate_limit`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl FetchError {
    fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            retry_after: None,
            status: None,
            details: None,
        }
    }

    pub fn rate_limited(retry_after: Duration) -> Self {
        Self {
            retry_after: Some(duration_millis(retry_after)),
            status: Some(429),
            ..Self::new(
                FetchErrorKind::RateLimit,
                "Rate limit exceeded. Please try again later.",
            )
        }
    }

    /// Classifies a non-2xx, non-429 response.
    ///
    /// `body` is the error body as returned by the relay (`{ error, details }`);
    /// its `error` text is only used for otherwise unclassified statuses.
    pub fn from_status(status: u16, body: Option<&RelayErrorBody>) -> Self {
        let kind = FetchErrorKind::from_status(status);
        let message = match kind {
            FetchErrorKind::AuthError => {
                String::from("Authentication failed. Please check your API credentials.")
            }
            FetchErrorKind::PermissionError => String::from(
                "Access forbidden. You may not have permission to access this resource.",
            ),
            FetchErrorKind::NotFound => {
                String::from("API endpoint not found. Please check the URL.")
            }
            FetchErrorKind::ServerError => {
                String::from("Server error. The API is temporarily unavailable.")
            }
            _ => body
                .and_then(|body| body.error.clone())
                .filter(|message| !message.trim().is_empty())
                .unwrap_or_else(|| format!("HTTP error! Status: {status}")),
        };

        Self {
            status: Some(status),
            details: body.and_then(RelayErrorBody::details_text),
            ..Self::new(kind, message)
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::NetworkError, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::UnknownError, message)
    }

    pub fn from_transport(error: &HttpError) -> Self {
        match error.kind() {
            HttpErrorKind::Build => Self::unknown(error.message()),
            HttpErrorKind::Timeout | HttpErrorKind::Connect | HttpErrorKind::Other => {
                let message = if error.message().trim().is_empty() {
                    "Failed to fetch data. Please check your connection."
                } else {
                    error.message()
                };
                Self::network(message)
            }
        }
    }

    pub const fn is_rate_limit(&self) -> bool {
        matches!(self.kind, FetchErrorKind::RateLimit)
    }
}

/// Structured error body produced by the relay (and many JSON APIs).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub details: Option<Value>,
    #[serde(default)]
    pub retry_after: Option<Value>,
}

impl RelayErrorBody {
    /// Parses a body leniently; anything that is not a JSON object is `None`.
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }

    fn details_text(&self) -> Option<String> {
        match self.details.as_ref()? {
            Value::Null => None,
            Value::String(text) if text.is_empty() => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn statuses_map_to_the_closed_taxonomy() {
        let cases = [
            (401, FetchErrorKind::AuthError),
            (403, FetchErrorKind::PermissionError),
            (404, FetchErrorKind::NotFound),
            (500, FetchErrorKind::ServerError),
            (507, FetchErrorKind::ServerError),
            (400, FetchErrorKind::HttpError),
            (418, FetchErrorKind::HttpError),
            (302, FetchErrorKind::HttpError),
        ];

        for (status, kind) in cases {
            let error = FetchError::from_status(status, None);
            assert_eq!(error.kind, kind, "status {status}");
            assert_eq!(error.status, Some(status));
            assert_eq!(error.retry_after, None);
        }
    }

    #[test]
    fn http_error_prefers_relay_message() {
        let body = RelayErrorBody::parse(r#"{"error": "quota exhausted", "details": "upstream text"}"#);
        let error = FetchError::from_status(400, body.as_ref());

        assert_eq!(error.message, "quota exhausted");
        assert_eq!(error.details.as_deref(), Some("upstream text"));

        let bare = FetchError::from_status(400, None);
        assert_eq!(bare.message, "HTTP error! Status: 400");
    }

    #[test]
    fn rate_limit_serializes_with_camel_case_retry_after() {
        let error = FetchError::rate_limited(Duration::from_secs(5));

        assert_eq!(
            serde_json::to_value(&error).expect("serializes"),
            json!({
                "message": "Rate limit exceeded. Please try again later.",
                "type": "rate_limit",
                "retryAfter": 5000,
                "status": 429
            })
        );
    }

    #[test]
    fn transport_errors_become_network_or_unknown() {
        assert_eq!(
            FetchError::from_transport(&HttpError::timeout("request timeout")).kind,
            FetchErrorKind::NetworkError
        );
        assert_eq!(
            FetchError::from_transport(&HttpError::build("bad url")).kind,
            FetchErrorKind::UnknownError
        );
    }

    #[test]
    fn non_object_bodies_are_ignored() {
        assert!(RelayErrorBody::parse("<html>oops</html>").is_none());
        assert!(RelayErrorBody::parse("[1,2]").is_none());
    }
}
