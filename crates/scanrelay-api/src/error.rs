//! HTTP error response conversion
//!
//! Handlers return `Result<_, HttpAppError>`. Every [`AppError`] renders with a fixed
//! status and body: `{error}` for most failures, the scan outcome for malware
//! rejections, and the scan outcome plus `uploaded: false` when forwarding failed.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use scanrelay_core::{AppError, ErrorMetadata, LogLevel};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// 403 body: the scan outcome that caused the rejection.
#[derive(Debug, Serialize, ToSchema)]
pub struct MalwareResponse {
    pub scan_result_code: i64,
    #[schema(value_type = Object)]
    pub scan_results: serde_json::Value,
}

/// 500 body when the file was scanned but could not be forwarded.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadFailedResponse {
    pub error: String,
    pub uploaded: bool,
    pub scan_result_code: Option<i64>,
    #[schema(value_type = Option<Object>)]
    pub scan_results: Option<serde_json::Value>,
}

/// Wrapper type for AppError to implement IntoResponse
/// This is necessary because of Rust's orphan rules - we can't implement
/// IntoResponse (external trait) for AppError (external type from scanrelay-core)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::Internal(err.to_string()))
    }
}

fn log_error(error: &AppError) {
    let code = error.error_code();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, code = code, "Request rejected");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, code = code, "Request rejected");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, code = code, "Request failed");
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = self.0;
        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(&app_error);

        match app_error {
            AppError::MalwareDetected(outcome) => (
                status,
                Json(MalwareResponse {
                    scan_result_code: outcome.code,
                    scan_results: outcome.payload,
                }),
            )
                .into_response(),
            AppError::StorageFailed { ref scan, .. } => {
                let body = UploadFailedResponse {
                    error: app_error.client_message(),
                    uploaded: false,
                    scan_result_code: scan.as_ref().map(|s| s.code),
                    scan_results: scan.as_ref().map(|s| s.payload.clone()),
                };
                (status, Json(body)).into_response()
            }
            other => (
                status,
                Json(ErrorResponse {
                    error: other.client_message(),
                }),
            )
                .into_response(),
        }
    }
}
