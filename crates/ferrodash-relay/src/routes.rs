//! Route configuration for the relay API.

use axum::http::{header, Method};
use axum::routing::{get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{proxy_get, proxy_post};
use crate::state::RelayState;

/// Create the relay router.
pub fn create_router(state: RelayState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/api/proxy", get(proxy_get).post(proxy_post))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
