use axum::{extract::{Extension, Path, Query, State}, http::StatusCode, Json};
use tracing::info;

use super::store_error;
use crate::models::{
    DocumentQuery, DocumentVersionResponse, DocumentVersionUpdateRequest, ErrorResponse, Identity,
};
use crate::AppState;

/// Get one version of a document
pub async fn doc_version(
    State(state): State<AppState>,
    Query(query): Query<DocumentQuery>,
    Path(number): Path<u32>,
) -> Result<(StatusCode, Json<DocumentVersionResponse>), (StatusCode, Json<ErrorResponse>)> {
    let document = state.config.document_or_default(query.doc.as_deref());

    let version = state
        .store
        .get_version(&document, number)
        .await
        .map_err(|e| store_error("load version", e))?;

    Ok((StatusCode::OK, Json(version.into())))
}

/// Overwrite an existing version of a document in place
pub async fn doc_version_update(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<DocumentQuery>,
    Path(number): Path<u32>,
    Json(request): Json<DocumentVersionUpdateRequest>,
) -> Result<(StatusCode, Json<DocumentVersionResponse>), (StatusCode, Json<ErrorResponse>)> {
    let document = state.config.document_or_default(query.doc.as_deref());

    state
        .store
        .update_version(&document, number, &request.content)
        .await
        .map_err(|e| store_error("update version", e))?;

    info!("'{}' updated version {} of document '{}'", identity.username, number, document);

    let version = state
        .store
        .get_version(&document, number)
        .await
        .map_err(|e| store_error("load updated version", e))?;

    Ok((StatusCode::OK, Json(version.into())))
}
