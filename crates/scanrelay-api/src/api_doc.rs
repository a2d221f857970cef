//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Scanrelay API",
        version = "0.1.0",
        description = "Upload relay: files posted to /upload are scanned for malware and forwarded to object storage."
    ),
    paths(
        handlers::upload::upload_file,
        handlers::object_url::get_object_url,
        handlers::health::health_check,
    ),
    components(schemas(
        handlers::upload::UploadResponse,
        handlers::object_url::ObjectUrlResponse,
        handlers::health::HealthResponse,
        error::ErrorResponse,
        error::MalwareResponse,
        error::UploadFailedResponse,
    )),
    tags(
        (name = "upload", description = "Scan and forward uploads"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
