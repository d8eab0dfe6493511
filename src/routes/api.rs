use axum::{middleware, routing::{get, put}, Router};

use crate::handlers::{diagnostics, doc_latest, doc_save, doc_version, doc_version_update, health_check, ready_check};
use crate::routes::auth_middleware::auth_middleware;
use crate::AppState;

/// Create API routes
pub fn create_api_routes(state: AppState) -> Router<AppState> {
    let authenticated = Router::<AppState>::new()
        .route("/documents", get(doc_latest).post(doc_save))
        .route("/documents/version/:number", put(doc_version_update).get(doc_version))
        .route("/v1/diagnostics", get(diagnostics))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware)); // Applies to all routes added above

    Router::<AppState>::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .merge(authenticated)
}
