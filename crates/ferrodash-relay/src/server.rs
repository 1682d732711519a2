//! Relay server implementation.

use std::future::Future;
use std::sync::Arc;

use ferrodash_core::HttpClient;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::RelayConfig;
use crate::error::{RelayError, RelayResult};
use crate::routes::create_router;
use crate::state::RelayState;

/// Same-origin relay that performs dashboard API requests server-side.
#[derive(Debug, Clone)]
pub struct RelayServer {
    state: RelayState,
}

impl RelayServer {
    #[must_use]
    pub fn new(config: RelayConfig, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            state: RelayState::new(config, http_client),
        }
    }

    #[must_use]
    pub fn state(&self) -> &RelayState {
        &self.state
    }

    /// Serve on the configured address until `shutdown` completes.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn serve_with_shutdown<F>(&self, shutdown: F) -> RelayResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.state.config().bind_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RelayError::BindFailed(addr, e))?;

        info!(addr = %addr, "relay listening");

        axum::serve(listener, create_router(self.state.clone()))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| RelayError::Internal(e.to_string()))?;

        info!("relay stopped");
        Ok(())
    }

    /// Serve until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn serve(&self) -> RelayResult<()> {
        self.serve_with_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    }
}
