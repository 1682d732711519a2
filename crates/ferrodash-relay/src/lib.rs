//! # ferrodash-relay
//!
//! Same-origin relay for the dashboard. Browsers cannot call most public
//! APIs directly because of CORS; the dashboard instead routes requests
//! through this server, which performs them and relays the JSON back.
//!
//! ## API Endpoints
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/api/proxy?url=&headers=` | GET | Fetch `url` with the JSON-encoded `headers` |
//! | `/api/proxy` | POST | Body `{url, headers, body}`; `body` is sent upstream as JSON |
//!
//! Upstream failures are reported as JSON objects with an `error` message:
//!
//! | Upstream | Relay status | Body |
//! |----------|--------------|------|
//! | 429 | 429 + `Retry-After` | `{error, details, retryAfter}` |
//! | other non-2xx | same status | `{error, details}` |
//! | non-JSON 2xx | 400 | `{error, text}` |
//! | transport failure | 500 | `{error}` |
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use ferrodash_core::ReqwestHttpClient;
//! use ferrodash_relay::{RelayConfig, RelayServer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = RelayConfig::default();
//!     let client = ReqwestHttpClient::with_user_agent(&config.user_agent);
//!     let server = RelayServer::new(config, Arc::new(client));
//!     // server.serve().await.unwrap();
//! }
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use config::RelayConfig;
pub use error::{RelayError, RelayResult};
pub use routes::create_router;
pub use server::RelayServer;
pub use state::RelayState;
