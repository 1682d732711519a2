//! HTTP request handlers for the relay API.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::Json;
use ferrodash_core::{HeaderSet, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{RelayError, RelayResult};
use crate::state::RelayState;

/// Query parameters for `GET /api/proxy`.
#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    /// Target URL.
    pub url: Option<String>,
    /// JSON object of headers to forward.
    pub headers: Option<String>,
}

/// JSON body for `POST /api/proxy`.
#[derive(Debug, Default, Deserialize)]
pub struct ProxyBody {
    pub url: Option<String>,
    #[serde(default)]
    pub headers: Map<String, Value>,
    /// Forwarded upstream as JSON when present.
    pub body: Option<Value>,
}

/// Forward a GET request to the target URL.
pub async fn proxy_get(
    State(state): State<RelayState>,
    Query(query): Query<ProxyQuery>,
) -> RelayResult<Json<Value>> {
    let url = non_empty(query.url).ok_or(RelayError::MissingUrl("URL parameter is required"))?;
    let headers = match query.headers.as_deref().filter(|raw| !raw.is_empty()) {
        Some(raw) => {
            let object: Map<String, Value> = serde_json::from_str(raw)
                .map_err(|e| RelayError::InvalidRequest(format!("invalid headers parameter: {e}")))?;
            header_set(&object)
        }
        None => HeaderSet::new(),
    };

    let request = HttpRequest::get(url)
        .with_header("user-agent", state.config().user_agent.as_str())
        .with_headers(&headers);
    forward(&state, request).await.map(Json)
}

/// Forward a POST request described by a JSON body.
pub async fn proxy_post(State(state): State<RelayState>, body: Bytes) -> RelayResult<Json<Value>> {
    let parsed: ProxyBody = serde_json::from_slice(&body)
        .map_err(|e| RelayError::InvalidRequest(format!("invalid request body: {e}")))?;
    let url = non_empty(parsed.url).ok_or(RelayError::MissingUrl("URL is required"))?;

    let mut request = HttpRequest::post(url)
        .with_header("content-type", "application/json")
        .with_header("user-agent", state.config().user_agent.as_str())
        .with_headers(&header_set(&parsed.headers));
    if let Some(payload) = parsed.body.filter(|value| !value.is_null()) {
        let encoded = serde_json::to_string(&payload)
            .map_err(|e| RelayError::Internal(e.to_string()))?;
        request = request.with_body(encoded);
    }

    forward(&state, request).await.map(Json)
}

async fn forward(state: &RelayState, request: HttpRequest) -> RelayResult<Value> {
    debug!(method = ?request.method, url = %request.url, "relaying request");
    let url = request.url.clone();

    let response = state.http_client().execute(request).await.map_err(|e| {
        warn!(url = %url, error = %e, "upstream request failed");
        let message = e.message();
        RelayError::Transport(if message.is_empty() {
            String::from("Failed to fetch data")
        } else {
            message.to_owned()
        })
    })?;

    into_payload(response)
}

fn into_payload(response: HttpResponse) -> RelayResult<Value> {
    if response.status == 429 {
        return Err(RelayError::RateLimited {
            retry_after: response.header("retry-after").map(str::to_owned),
            details: response.body,
        });
    }
    if !response.is_success() {
        return Err(RelayError::upstream(response.status, response.body));
    }

    serde_json::from_str(&response.body).map_err(|_| RelayError::NotJson {
        text: response.body,
    })
}

/// Non-string header values are forwarded in their JSON text form.
fn header_set(object: &Map<String, Value>) -> HeaderSet {
    HeaderSet::from_pairs(object.iter().map(|(name, value)| {
        let value = match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        (name.as_str(), value)
    }))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|url| !url.trim().is_empty())
}
