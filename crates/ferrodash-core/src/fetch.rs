//! Fetch-through coordinator: backoff, cache, transport, error classification.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::backoff::BackoffTable;
use crate::cache::{CacheKey, CacheMode, MemoryCache, ResponseCache};
use crate::clock::{saturating_add, Clock, SystemClock};
use crate::config::{parse_retry_after, CoordinatorConfig};
use crate::error::ValidationError;
use crate::fetch_error::{FetchError, RelayErrorBody};
use crate::headers::HeaderSet;
use crate::http_client::{HttpClient, HttpResponse, ReqwestHttpClient};

/// One fetch request for an endpoint and header set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub endpoint: String,
    pub headers: HeaderSet,
    /// Cache lifetime of a successful response. `None` uses the default TTL.
    pub ttl: Option<Duration>,
    pub cache_mode: CacheMode,
}

impl FetchRequest {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ValidationError> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(ValidationError::EmptyEndpoint);
        }
        Ok(Self {
            endpoint: endpoint.trim().to_owned(),
            headers: HeaderSet::new(),
            ttl: None,
            cache_mode: CacheMode::Use,
        })
    }

    pub fn with_headers(mut self, headers: HeaderSet) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Bypass the cache read and any backoff window for this request.
    pub fn skip_cache(mut self) -> Self {
        self.cache_mode = CacheMode::Refresh;
        self
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(self.endpoint.clone(), &self.headers)
    }
}

/// Uniform fetch result. Exactly one of `data` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOutcome {
    pub data: Option<Value>,
    pub from_cache: bool,
    pub error: Option<FetchError>,
}

impl FetchOutcome {
    pub fn fresh(data: Value) -> Self {
        Self {
            data: Some(data),
            from_cache: false,
            error: None,
        }
    }

    pub fn cached(data: Value) -> Self {
        Self {
            data: Some(data),
            from_cache: true,
            error: None,
        }
    }

    pub fn failed(error: FetchError) -> Self {
        Self {
            data: None,
            from_cache: false,
            error: Some(error),
        }
    }

    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Value, FetchError> {
        match (self.data, self.error) {
            (_, Some(error)) => Err(error),
            (Some(data), None) => Ok(data),
            (None, None) => Ok(Value::Null),
        }
    }
}

/// Coordinates cache lookups, rate-limit backoff and network fetches.
///
/// Clones share the same cache, backoff table and transport.
#[derive(Clone)]
pub struct FetchCoordinator {
    cache: Arc<dyn ResponseCache>,
    backoff: BackoffTable,
    http_client: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
    config: CoordinatorConfig,
}

impl std::fmt::Debug for FetchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchCoordinator")
            .field("clock", &self.clock)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FetchCoordinator {
    /// Coordinator over the reqwest transport and a fresh in-memory cache.
    pub fn new(config: CoordinatorConfig) -> Self {
        let cache = MemoryCache::new(config.default_ttl);
        Self::with_parts(
            Arc::new(cache),
            Arc::new(ReqwestHttpClient::new()),
            Arc::new(SystemClock),
            config,
        )
    }

    pub fn with_parts(
        cache: Arc<dyn ResponseCache>,
        http_client: Arc<dyn HttpClient>,
        clock: Arc<dyn Clock>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            cache,
            backoff: BackoffTable::new(),
            http_client,
            clock,
            config,
        }
    }

    pub fn cache(&self) -> &Arc<dyn ResponseCache> {
        &self.cache
    }

    pub fn backoff(&self) -> &BackoffTable {
        &self.backoff
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Fetches `request`, never failing past this boundary.
    ///
    /// In [`CacheMode::Use`] an open backoff window returns its stored error
    /// and a fresh cache entry is served without touching the transport.
    pub async fn fetch(&self, request: &FetchRequest) -> FetchOutcome {
        let key = request.cache_key();

        if request.cache_mode == CacheMode::Use {
            if let Some(error) = self.backoff.active(&key, self.clock.now()).await {
                debug!(endpoint = %request.endpoint, "backoff window open, skipping transport");
                return FetchOutcome::failed(error);
            }
            if let Some(data) = self.cache.get(&key).await {
                debug!(endpoint = %request.endpoint, "cache hit");
                return FetchOutcome::cached(data);
            }
            debug!(endpoint = %request.endpoint, "cache miss");
        }

        let http_request = match self.config.route.build_request(&request.endpoint, &request.headers) {
            Ok(http_request) => http_request.with_timeout_ms(self.timeout_ms()),
            Err(error) => {
                warn!(endpoint = %request.endpoint, error = %error, "failed to encode request");
                return FetchOutcome::failed(FetchError::unknown(error.to_string()));
            }
        };

        let response = match self.http_client.execute(http_request).await {
            Ok(response) => response,
            Err(error) => {
                warn!(endpoint = %request.endpoint, error = %error, "transport failure");
                return FetchOutcome::failed(FetchError::from_transport(&error));
            }
        };

        if response.status == 429 {
            return self.record_rate_limit(key, &response).await;
        }

        if !response.is_success() {
            let body = RelayErrorBody::parse(&response.body);
            let error = FetchError::from_status(response.status, body.as_ref());
            info!(
                endpoint = %request.endpoint,
                status = response.status,
                kind = %error.kind,
                "upstream returned an error status"
            );
            return FetchOutcome::failed(error);
        }

        let data: Value = match serde_json::from_str(&response.body) {
            Ok(data) => data,
            Err(error) => {
                warn!(endpoint = %request.endpoint, error = %error, "response body is not JSON");
                return FetchOutcome::failed(FetchError::network(format!(
                    "Failed to parse response: {error}"
                )));
            }
        };

        self.cache.set(key.clone(), data.clone(), request.ttl).await;
        self.backoff.clear(&key).await;
        FetchOutcome::fresh(data)
    }

    /// Drops the cached payload for `request`. Returns whether one existed.
    pub async fn invalidate(&self, request: &FetchRequest) -> bool {
        self.cache.invalidate(&request.cache_key()).await
    }

    async fn record_rate_limit(&self, key: CacheKey, response: &HttpResponse) -> FetchOutcome {
        let retry_after = response
            .header("retry-after")
            .and_then(parse_retry_after)
            .or_else(|| body_retry_after(&response.body))
            .unwrap_or(self.config.default_retry_after);
        let error = FetchError::rate_limited(retry_after);
        let retry_until = saturating_add(self.clock.now(), retry_after);

        warn!(
            endpoint = %key.endpoint,
            retry_after_ms = error.retry_after,
            "rate limited, backing off"
        );
        self.backoff.record(key, retry_until, error.clone()).await;
        FetchOutcome::failed(error)
    }

    fn timeout_ms(&self) -> Option<u64> {
        self.config
            .timeout
            .map(|timeout| u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX))
    }
}

/// `retryAfter` seconds from a relay 429 body, when the header was stripped.
fn body_retry_after(body: &str) -> Option<Duration> {
    match RelayErrorBody::parse(body)?.retry_after? {
        Value::Number(number) => number.as_u64().map(Duration::from_secs),
        Value::String(text) => parse_retry_after(&text),
        _ => None,
    }
}
