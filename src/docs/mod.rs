use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/api/ready",
    responses(
        (status = 200, description = "Version store is reachable", body = HealthResponse),
        (status = 503, description = "Version store is unavailable", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Version count and newest version of a document
#[utoipa::path(
    get,
    path = "/api/documents",
    params(DocumentQuery),
    responses(
        (status = 200, description = "Version history summary", body = DocumentLatestResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 503, description = "Version store is unavailable", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn doc_latest_doc() {}

/// Append the content as a new version
#[utoipa::path(
    post,
    path = "/api/documents",
    params(DocumentQuery),
    request_body = DocumentSaveRequest,
    responses(
        (status = 201, description = "Version appended", body = DocumentSaveResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 503, description = "Version store is unavailable", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn doc_save_doc() {}

/// Get one version of a document
#[utoipa::path(
    get,
    path = "/api/documents/version/{number}",
    params(
        ("number" = u32, Path, description = "Version number, starting at 1"),
        DocumentQuery
    ),
    responses(
        (status = 200, description = "The requested version", body = DocumentVersionResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "No such version", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn doc_version_doc() {}

/// Overwrite an existing version in place
#[utoipa::path(
    put,
    path = "/api/documents/version/{number}",
    params(
        ("number" = u32, Path, description = "Version number, starting at 1"),
        DocumentQuery
    ),
    request_body = DocumentVersionUpdateRequest,
    responses(
        (status = 200, description = "The updated version", body = DocumentVersionResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "No such version", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn doc_version_update_doc() {}

/// Server diagnostics
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Room, connection and host figures", body = DiagnosticsResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        doc_latest_doc,
        doc_save_doc,
        doc_version_doc,
        doc_version_update_doc,
        diagnostics_doc,
    ),
    components(
        schemas(
            HealthResponse,
            DiagnosticsResponse,
            DocumentLatestResponse,
            DocumentSaveRequest,
            DocumentSaveResponse,
            DocumentVersionResponse,
            DocumentVersionUpdateRequest,
            ErrorResponse,
        )
    ),
    tags(
        (name = "api", description = "Document version endpoints")
    )
)]
pub struct ApiDoc;
