//! Error types for the relay server.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;

/// Result type alias for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

/// `Retry-After` value returned when upstream sent none.
pub const DEFAULT_RETRY_AFTER: &str = "60";

/// Errors the relay reports to its caller.
///
/// Every variant renders as a JSON object with an `error` message; the
/// dashboard's fetch path reads `error`, `details` and `retryAfter` from it.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Target URL missing from the request.
    #[error("{0}")]
    MissingUrl(&'static str),

    /// Request parameters or body could not be decoded.
    #[error("{0}")]
    InvalidRequest(String),

    /// Upstream answered 429.
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited {
        details: String,
        /// Raw upstream `Retry-After` header.
        retry_after: Option<String>,
    },

    /// Upstream answered another non-2xx status.
    #[error("{message}")]
    Upstream {
        status: u16,
        message: String,
        details: String,
    },

    /// Upstream body is not JSON.
    #[error("Response is not valid JSON")]
    NotJson { text: String },

    /// The upstream request could not be completed.
    #[error("{0}")]
    Transport(String),

    /// Invalid server configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to bind to the specified address.
    #[error("failed to bind to {0}: {1}")]
    BindFailed(std::net::SocketAddr, std::io::Error),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Error for a non-2xx, non-429 upstream status.
    pub fn upstream(status: u16, details: String) -> Self {
        let message = match status {
            401 => String::from("Authentication failed. Please check your API credentials."),
            403 => String::from(
                "Access forbidden. You may not have permission to access this resource.",
            ),
            404 => String::from("API endpoint not found. Please check the URL."),
            500.. => String::from("Server error. The API is temporarily unavailable."),
            _ => format!("HTTP error! status: {status}"),
        };
        Self::Upstream {
            status,
            message,
            details,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingUrl(_) | Self::InvalidRequest(_) | Self::NotJson { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::Transport(_)
            | Self::InvalidConfig(_)
            | Self::BindFailed(_, _)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> Value {
        let error = self.to_string();
        match self {
            Self::RateLimited {
                details,
                retry_after,
            } => json!({
                "error": error,
                "details": details,
                "retryAfter": retry_after.as_deref().and_then(leading_seconds),
            }),
            Self::Upstream { details, .. } => json!({ "error": error, "details": details }),
            Self::NotJson { text } => json!({ "error": error, "text": text }),
            _ => json!({ "error": error }),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (status, Json(self.body())).into_response();

        if let Self::RateLimited { retry_after, .. } = &self {
            let value = retry_after
                .as_deref()
                .and_then(|raw| HeaderValue::from_str(raw).ok())
                .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_RETRY_AFTER));
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }

        response
    }
}

fn leading_seconds(raw: &str) -> Option<u64> {
    ferrodash_core::parse_retry_after(raw).map(|duration| duration.as_secs())
}
