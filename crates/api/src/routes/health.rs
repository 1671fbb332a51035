//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::{AppState, Backend};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// The cache is advisory, so a failing cache degrades but does not fail the check.
    pub cache: &'static str,
}

/// GET /health: returns system health status.
pub async fn check<L: Backend>(State(state): State<Arc<AppState<L>>>) -> Json<HealthResponse> {
    let cache = match state.cache.ping().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "cache ping failed");
            "unavailable"
        }
    };
    Json(HealthResponse {
        status: "ok",
        cache,
    })
}
