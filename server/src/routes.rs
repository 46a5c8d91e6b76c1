//! Route definitions for the oracle server API

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::handlers::{api_root, set_flight_status};

// Dapp-facing routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api", get(api_root))
        .route("/api/status/:status", get(set_flight_status))
}

/// Full router with CORS open to any origin and request tracing.
pub fn build_router(state: AppState) -> Router {
    api_routes()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
