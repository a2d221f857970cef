//! Multipart staging for the upload handler

use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;
use scanrelay_core::constants::DEFAULT_CONTENT_TYPE;
use scanrelay_core::{sanitize_filename, AppError, Disposition};
use scanrelay_services::{ScratchSpace, StagedUpload};

/// Name of the multipart part carrying the file.
pub const FILE_FIELD: &str = "file";

/// Name of the optional text part overriding the default disposition.
pub const DISPOSITION_FIELD: &str = "disposition";

/// A body cut off by the request size limit is a 413; anything else the
/// multipart parser rejects is a malformed request.
fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::InvalidMultipart(err.body_text())
    }
}

/// Stream the `file` part of `multipart` into a fresh scratch file.
///
/// A `file` part without a filename attribute counts as absent. An empty filename
/// is rejected before anything is written. Only one `file` part is accepted.
pub async fn stage_multipart_file(
    mut multipart: Multipart,
    scratch: &ScratchSpace,
    default_disposition: Disposition,
) -> Result<StagedUpload, AppError> {
    let mut staged: Option<StagedUpload> = None;
    let mut disposition: Option<Disposition> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();

        match field_name.as_str() {
            FILE_FIELD => {
                let Some(client_filename) = field.file_name().map(|s| s.to_string()) else {
                    continue;
                };
                if client_filename.is_empty() {
                    return Err(AppError::EmptyFilename);
                }
                if staged.is_some() {
                    return Err(AppError::InvalidInput(
                        "Multiple file fields are not allowed; send exactly one field named 'file'"
                            .to_string(),
                    ));
                }

                let filename = sanitize_filename(&client_filename);
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

                let mut file = scratch.create(&filename).await?;
                while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                    file.write_chunk(&chunk).await?;
                }
                file.finish().await?;

                tracing::info!(
                    filename = %filename,
                    path = %file.path().display(),
                    size_bytes = file.len(),
                    content_type = %content_type,
                    "Upload staged"
                );

                staged = Some(StagedUpload {
                    scratch: file,
                    filename,
                    content_type,
                    disposition: default_disposition,
                });
            }
            DISPOSITION_FIELD => {
                let value = field.text().await.map_err(multipart_error)?;
                let parsed = value
                    .parse::<Disposition>()
                    .map_err(|e| AppError::InvalidInput(e.to_string()))?;
                disposition = Some(parsed);
            }
            _ => {
                tracing::debug!(field = %field_name, "Ignoring multipart field");
            }
        }
    }

    let mut staged = staged.ok_or(AppError::MissingFilePart)?;
    if let Some(disposition) = disposition {
        staged.disposition = disposition;
    }
    Ok(staged)
}
