//! Relay server configuration.

use std::env;
use std::net::SocketAddr;

use crate::error::RelayError;

pub const BIND_ADDR_ENV: &str = "FERRODASH_RELAY_ADDR";
pub const USER_AGENT_ENV: &str = "FERRODASH_RELAY_USER_AGENT";

/// Browser-like agent; some public APIs reject unknown clients.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Configuration for the relay server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Address to bind the HTTP server to.
    pub bind_addr: SocketAddr,
    /// `User-Agent` sent upstream unless the caller supplies one.
    pub user_agent: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl RelayConfig {
    /// Create a new configuration with the specified bind address.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Self::default()
        }
    }

    /// Set the upstream `User-Agent`.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn from_env() -> Result<Self, RelayError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads overrides through `lookup`; unset or blank values keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RelayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(raw) = read(BIND_ADDR_ENV) {
            config.bind_addr = raw
                .trim()
                .parse()
                .map_err(|_| RelayError::InvalidConfig(format!("{BIND_ADDR_ENV}='{raw}'")))?;
        }
        if let Some(user_agent) = read(USER_AGENT_ENV) {
            config.user_agent = user_agent;
        }

        Ok(config)
    }
}
