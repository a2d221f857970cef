use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// Active scanner backend, or `disabled`.
    pub scanning: String,
    /// Object store backend.
    pub storage: String,
}

/// Liveness check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "alive".to_string(),
        scanning: state
            .relay
            .scanner_name()
            .unwrap_or("disabled")
            .to_string(),
        storage: state.relay.storage_backend().to_string(),
    })
}
