use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use scanrelay_core::AppError;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{ErrorResponse, HttpAppError, MalwareResponse, UploadFailedResponse};
use crate::state::AppState;
use crate::utils::upload::stage_multipart_file;

/// Multipart form accepted by `POST /upload` (documentation only).
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    /// The file; its filename attribute must be non-empty.
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
    /// `inline` (default) or `attachment`.
    disposition: Option<String>,
}

/// Body returned when the file was forwarded to the object store.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub message: String,
    pub uploaded: bool,
    /// `null` when scanning is disabled.
    pub scan_result_code: Option<i64>,
    /// Raw scanner verdict; `null` when scanning is disabled.
    #[schema(value_type = Option<Object>)]
    pub scan_results: Option<serde_json::Value>,
}

/// Upload a file
///
/// Stages the `file` part to scratch space, scans it when scanning is enabled,
/// and forwards it to the object store under the configured key prefix unless
/// the scanner reported malware. The scratch file is removed in every case.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File scanned and forwarded", body = UploadResponse),
        (status = 400, description = "Missing file part, empty filename or malformed multipart body", body = ErrorResponse),
        (status = 403, description = "Scanner reported malware; nothing was forwarded", body = MalwareResponse),
        (status = 413, description = "Request body exceeds the maximum upload size", body = ErrorResponse),
        (status = 500, description = "Staging, scanning or forwarding failed. Forwarding failures also carry `uploaded` and the scan outcome", body = UploadFailedResponse)
    )
)]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, HttpAppError> {
    // A body that is not multipart at all carries no file part.
    let multipart = multipart.map_err(|rejection| {
        tracing::debug!(rejection = %rejection.body_text(), "Request is not multipart");
        AppError::MissingFilePart
    })?;

    let staged = stage_multipart_file(
        multipart,
        &state.scratch,
        state.config.default_disposition(),
    )
    .await?;

    let report = state.relay.relay(staged).await?;

    tracing::info!(
        key = %report.storage_key,
        url = %report.storage_url,
        scan_result_code = ?report.scan.as_ref().map(|s| s.code),
        "File uploaded successfully"
    );

    Ok(Json(UploadResponse {
        message: "File uploaded successfully.".to_string(),
        uploaded: report.uploaded,
        scan_result_code: report.scan.as_ref().map(|s| s.code),
        scan_results: report.scan.map(|s| s.payload),
    }))
}
