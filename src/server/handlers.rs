//! Request handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse};

use super::AppState;
use crate::ingest::TriggerOutcome;

/// Health check endpoint for container orchestration.
pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}

pub async fn import_jl(State(state): State<AppState>) -> impl IntoResponse {
    start_import(&state, "Import started")
}

/// Same run as [`import_jl`]; kept as a separate route for existing callers.
pub async fn import_jl_folder(State(state): State<AppState>) -> impl IntoResponse {
    start_import(&state, "Import started for folder")
}

fn start_import(state: &AppState, message: &'static str) -> (StatusCode, &'static str) {
    match state.importer.trigger() {
        TriggerOutcome::Accepted => (StatusCode::ACCEPTED, message),
        TriggerOutcome::Skipped => (StatusCode::CONFLICT, "Import already running"),
    }
}
