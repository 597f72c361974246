//! Router configuration for the web server.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/reviews/import-jl", post(handlers::import_jl))
        .route("/api/reviews/import-jl-folder", post(handlers::import_jl_folder))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
