use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Response for an error
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: u16,
    pub status: String,
    pub error: String,
}

impl ErrorResponse {
    pub fn with_status(status: StatusCode, error: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
        (status, Json(ErrorResponse {
            code: status.as_u16(),
            status: status.to_string(),
            error: error.into(),
        }))
    }
}

/// Failures of the synchronization and versioning engine.
///
/// Every error stays local to the connection that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Missing or invalid credential. Fatal for a join.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("version {version} of document '{document}' not found")]
    NotFound { document: String, version: u32 },

    /// Transient persistence fault, never retried automatically.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The live connection went away.
    #[error("transport lost")]
    TransportLost,

    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl SyncError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SyncError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            SyncError::NotFound { .. } => StatusCode::NOT_FOUND,
            SyncError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            SyncError::TransportLost => StatusCode::BAD_GATEWAY,
            SyncError::InvalidState(_) => StatusCode::CONFLICT,
        }
    }

    /// The `(status, body)` pair handlers return on failure.
    pub fn to_error_response(&self) -> (StatusCode, Json<ErrorResponse>) {
        ErrorResponse::with_status(self.status_code(), self.to_string())
    }
}

impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        self.to_error_response().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_http_statuses() {
        assert_eq!(SyncError::Unauthorized("bad".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            SyncError::NotFound { document: "global".into(), version: 3 }.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            SyncError::StorageUnavailable("down".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn error_body_carries_the_message() {
        let (status, Json(body)) = SyncError::NotFound { document: "global".into(), version: 7 }.to_error_response();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, 404);
        assert_eq!(body.error, "version 7 of document 'global' not found");
    }
}
