//! Fetch coordinator configuration and request routing.

use std::env;
use std::time::Duration;

use crate::cache::DEFAULT_TTL;
use crate::error::ValidationError;
use crate::headers::HeaderSet;
use crate::http_client::HttpRequest;

/// Retry window applied when a 429 response carries no usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

pub const RELAY_URL_ENV: &str = "FERRODASH_RELAY_URL";
pub const DEFAULT_TTL_ENV: &str = "FERRODASH_DEFAULT_TTL_SECS";
pub const TIMEOUT_ENV: &str = "FERRODASH_TIMEOUT_MS";

/// How outbound requests reach the upstream API.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestRoute {
    /// Call the endpoint directly with the caller's headers.
    #[default]
    Direct,
    /// Call a same-origin relay that performs the request server-side.
    Relay { base_url: String },
}

impl RequestRoute {
    pub fn relay(base_url: impl Into<String>) -> Result<Self, ValidationError> {
        let base_url = base_url.into();
        let trimmed = base_url.trim();
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ValidationError::InvalidRelayUrl { value: base_url });
        }
        Ok(Self::Relay {
            base_url: trimmed.to_owned(),
        })
    }

    /// Builds the transport request for `endpoint`.
    ///
    /// Relay requests carry the target as `url=` and a non-empty header set as
    /// JSON in `headers=`, both percent-encoded.
    pub fn build_request(
        &self,
        endpoint: &str,
        headers: &HeaderSet,
    ) -> Result<HttpRequest, serde_json::Error> {
        match self {
            Self::Direct => Ok(HttpRequest::get(endpoint).with_headers(headers)),
            Self::Relay { base_url } => {
                let separator = if base_url.contains('?') { '&' } else { '?' };
                let mut url = format!(
                    "{base_url}{separator}url={}",
                    urlencoding::encode(endpoint)
                );
                if !headers.is_empty() {
                    url.push_str("&headers=");
                    url.push_str(&urlencoding::encode(&headers.to_json()?));
                }
                Ok(HttpRequest::get(url))
            }
        }
    }
}

/// Settings shared by every fetch a coordinator performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub default_ttl: Duration,
    pub default_retry_after: Duration,
    pub route: RequestRoute,
    /// Per-request timeout. `None` waits as long as the transport allows.
    pub timeout: Option<Duration>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            default_retry_after: DEFAULT_RETRY_AFTER,
            route: RequestRoute::Direct,
            timeout: None,
        }
    }
}

impl CoordinatorConfig {
    /// Reads overrides from `FERRODASH_*` environment variables.
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads overrides through `lookup`; unset or blank values keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = read(RELAY_URL_ENV) {
            config.route = RequestRoute::relay(url)?;
        }
        if let Some(raw) = read(DEFAULT_TTL_ENV) {
            let secs = parse_number(DEFAULT_TTL_ENV, &raw)?;
            if secs > 0 {
                config.default_ttl = Duration::from_secs(secs);
            }
        }
        if let Some(raw) = read(TIMEOUT_ENV) {
            let millis = parse_number(TIMEOUT_ENV, &raw)?;
            config.timeout = (millis > 0).then(|| Duration::from_millis(millis));
        }

        Ok(config)
    }

    pub fn with_route(mut self, route: RequestRoute) -> Self {
        self.route = route;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }
}

/// Reads a `Retry-After` header value as whole seconds.
///
/// Leading digits are taken and anything after them ignored (`"5"`, `"5, x"`);
/// a value with no leading digits is `None`.
pub fn parse_retry_after(raw: &str) -> Option<Duration> {
    let trimmed = raw.trim_start();
    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    trimmed[..digits_end]
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn parse_number(name: &'static str, raw: &str) -> Result<u64, ValidationError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ValidationError::InvalidNumber {
            name,
            value: raw.to_owned(),
        })
}
