use axum::{extract::State, http::StatusCode, Json};
use tracing::{debug, warn};

use crate::models::HealthResponse;
use crate::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    debug!("Health check requested");
    let (rooms, _) = state.registry.stats().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
        rooms: rooms as u32,
    })
}

/// Readiness check endpoint
///
/// Ready once the version store answers.
pub async fn ready_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    debug!("Readiness check requested");
    let (rooms, _) = state.registry.stats().await;
    match state.store.count(&state.config.default_document).await {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".to_string(),
                message: "Service is ready".to_string(),
                rooms: rooms as u32,
            }),
        ),
        Err(e) => {
            warn!("Readiness check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable".to_string(),
                    message: e.to_string(),
                    rooms: rooms as u32,
                }),
            )
        }
    }
}
