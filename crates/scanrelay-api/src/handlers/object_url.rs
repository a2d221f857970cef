use std::sync::Arc;

use axum::{extract::State, Json};
use scanrelay_core::AppError;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct ObjectUrlResponse {
    pub s3_url: String,
}

/// Configured object URL
///
/// Returns the `s3_object_url` configuration value verbatim.
#[utoipa::path(
    get,
    path = "/get-s3",
    tag = "upload",
    responses(
        (status = 200, description = "Configured object URL", body = ObjectUrlResponse),
        (status = 404, description = "No object URL configured", body = ErrorResponse)
    )
)]
pub async fn get_object_url(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ObjectUrlResponse>, HttpAppError> {
    let url = state
        .config
        .s3_object_url()
        .ok_or_else(|| AppError::NotFound("S3 URL not found".to_string()))?;

    Ok(Json(ObjectUrlResponse {
        s3_url: url.to_string(),
    }))
}
