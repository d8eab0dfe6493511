use axum::{extract::{Extension, Query, State}, http::StatusCode, Json};
use tracing::info;

use super::store_error;
use crate::models::{DocumentQuery, DocumentSaveRequest, DocumentSaveResponse, ErrorResponse, Identity};
use crate::AppState;

/// Append the content as the next version of a document
pub async fn doc_save(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<DocumentQuery>,
    Json(request): Json<DocumentSaveRequest>,
) -> Result<(StatusCode, Json<DocumentSaveResponse>), (StatusCode, Json<ErrorResponse>)> {
    let document = state.config.document_or_default(query.doc.as_deref());

    let version = state
        .store
        .append_version(&document, &request.content)
        .await
        .map_err(|e| store_error("append version", e))?;

    info!("'{}' saved version {} of document '{}'", identity.username, version, document);

    // Numbers are contiguous, so the new number is the new count
    Ok((
        StatusCode::CREATED,
        Json(DocumentSaveResponse {
            document,
            version,
            total: version,
        }),
    ))
}
