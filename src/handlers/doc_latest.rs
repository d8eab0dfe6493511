use axum::{extract::{Query, State}, http::StatusCode, Json};

use super::store_error;
use crate::models::{DocumentLatestResponse, DocumentQuery, DocumentVersionResponse, ErrorResponse};
use crate::AppState;

/// Get how many versions a document has, together with the newest one
pub async fn doc_latest(
    State(state): State<AppState>,
    Query(query): Query<DocumentQuery>,
) -> Result<(StatusCode, Json<DocumentLatestResponse>), (StatusCode, Json<ErrorResponse>)> {
    let document = state.config.document_or_default(query.doc.as_deref());

    let total = state
        .store
        .count(&document)
        .await
        .map_err(|e| store_error("count versions", e))?;

    let latest: Option<DocumentVersionResponse> = match total {
        0 => None,
        n => Some(
            state
                .store
                .get_version(&document, n)
                .await
                .map_err(|e| store_error("load latest version", e))?
                .into(),
        ),
    };

    Ok((StatusCode::OK, Json(DocumentLatestResponse { document, total, latest })))
}
