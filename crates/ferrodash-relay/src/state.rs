//! Shared state for the relay server.

use std::sync::Arc;

use ferrodash_core::HttpClient;

use crate::config::RelayConfig;

/// State handed to every proxy handler.
#[derive(Clone)]
pub struct RelayState {
    config: Arc<RelayConfig>,
    http_client: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for RelayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RelayState {
    /// Create a new relay state that forwards through `http_client`.
    pub fn new(config: RelayConfig, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            config: Arc::new(config),
            http_client,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    #[must_use]
    pub fn http_client(&self) -> &dyn HttpClient {
        self.http_client.as_ref()
    }
}
