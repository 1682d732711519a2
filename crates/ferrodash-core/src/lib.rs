//! # Ferrodash Core
//!
//! Data ingestion and normalization pipeline for ferrodash dashboards.
//!
//! ## Overview
//!
//! Users point arbitrary JSON APIs at a dashboard; this crate turns whatever
//! comes back into records a card, table or chart can render:
//!
//! - **Fetch-through cache** keyed by endpoint and header set, with TTL expiry
//! - **Rate-limit backoff** honouring `Retry-After` per endpoint
//! - **Shape detection** over a closed set of payload shapes
//! - **Field discovery** producing addressable dot/bracket paths
//! - **Normalization** of a shape plus a field selection into uniform records
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`backoff`] | Per-endpoint rate-limit windows |
//! | [`cache`] | In-memory response cache |
//! | [`clock`] | Injectable wall clock |
//! | [`config`] | Coordinator settings and request routing |
//! | [`detect`] | Structural shape detection |
//! | [`error`] | Core error types |
//! | [`fetch`] | Fetch coordinator and result envelope |
//! | [`fetch_error`] | Fetch error taxonomy |
//! | [`headers`] | Canonical header sets |
//! | [`http_client`] | HTTP client abstraction |
//! | [`normalize`] | Shape-specific normalization |
//! | [`paths`] | Path extraction and resolution |
//! | [`refresh`] | Timer-driven widget refresh |
//! | [`selection`] | Field discovery and display-mode selection |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ferrodash_core::{normalize_payload, CoordinatorConfig, FetchCoordinator, FetchRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let coordinator = FetchCoordinator::new(CoordinatorConfig::from_env()?);
//!     let request = FetchRequest::new("https://api.coinbase.com/v2/exchange-rates?currency=BTC")?;
//!
//!     let outcome = coordinator.fetch(&request).await;
//!     if let Some(data) = outcome.data.as_ref() {
//!         let (shape, records) = normalize_payload(data, &[]);
//!         println!("{shape}: {}", serde_json::to_string(&records)?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐
//! │ FetchCoordinator │────▶│ BackoffTable     │
//! └────────┬─────────┘     └──────────────────┘
//!          │
//!          ├──────────────▶┌──────────────────┐
//!          │               │ ResponseCache    │
//!          │               └──────────────────┘
//!          ▼
//! ┌──────────────────┐
//! │ HttpClient       │  direct, or through the relay
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │ detect / paths   │────▶│ normalize        │
//! └──────────────────┘     └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Fetch failures are data, not `Err`:
//!
//! ```rust
//! use ferrodash_core::{FetchErrorKind, FetchOutcome};
//!
//! fn describe(outcome: &FetchOutcome) -> &'static str {
//!     match outcome.error.as_ref().map(|error| error.kind) {
//!         None => "ok",
//!         Some(FetchErrorKind::RateLimit) => "backing off",
//!         Some(FetchErrorKind::NetworkError) => "offline",
//!         Some(_) => "failed",
//!     }
//! }
//! ```

pub mod backoff;
pub mod cache;
pub mod clock;
pub mod config;
pub mod detect;
pub mod error;
pub mod fetch;
pub mod fetch_error;
pub mod headers;
pub mod http_client;
pub mod normalize;
pub mod paths;
pub mod refresh;
pub mod selection;

// Backoff
pub use backoff::{BackoffRecord, BackoffTable};

// Caching
pub use cache::{
    spawn_sweeper, CacheEntry, CacheKey, CacheMode, CacheStats, MemoryCache, ResponseCache,
    DEFAULT_TTL,
};

// Clock
pub use clock::{saturating_add, Clock, ManualClock, SystemClock};

// Configuration
pub use config::{parse_retry_after, CoordinatorConfig, RequestRoute, DEFAULT_RETRY_AFTER};

// Shape detection
pub use detect::{classify_payload, detect_shape, has_tabular_array, ShapeTag};

// Error types
pub use error::ValidationError;

// Fetching
pub use fetch::{FetchCoordinator, FetchOutcome, FetchRequest};
pub use fetch_error::{FetchError, FetchErrorKind, RelayErrorBody};

// Headers
pub use headers::HeaderSet;

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpErrorKind, HttpMethod, HttpRequest, HttpResponse,
    ReqwestHttpClient, ScriptedHttpClient,
};

// Normalization
pub use normalize::{
    normalize, normalize_payload, Metric, NormalizedResult, RateEntry, ShapedRecords,
    TimeSeriesPoint, NO_ARRAY_DATA, UNSUPPORTED_FORMAT,
};

// Paths
pub use paths::{extract_paths, resolve_path, FieldDescriptor, FieldType, ROOT_PATH};

// Refresh loop
pub use refresh::{spawn_refresh, RefreshHandle, RefreshUpdate, WidgetSource, DEFAULT_REFRESH_INTERVAL};

// Field selection
pub use selection::{
    array_field_count, discover, fields_for_display, filter_fields, validate_field_selection,
    DisplayMode, FieldDiscovery, SelectionError,
};
