pub mod api;
pub mod auth_middleware;

pub use api::create_api_routes;

use axum::{http::HeaderValue, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::docs::ApiDoc;
use crate::websocket::websocket_handler;
use crate::AppState;

/// Assemble the full application router.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_origins.as_deref());

    Router::new()
        // Mount API routes
        .nest("/api", create_api_routes(state.clone()))
        // Live channel
        .route("/ws", get(websocket_handler))
        .with_state(state)
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add tracing layer
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn cors_layer(origins: Option<&str>) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origins.map(str::trim).filter(|o| !o.is_empty() && *o != "*") {
        None => base.allow_origin(Any),
        Some(list) => {
            let origins: Vec<HeaderValue> = list
                .split(',')
                .filter_map(|origin| match origin.trim().parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!("Ignoring invalid CORS origin '{}'", origin);
                        None
                    }
                })
                .collect();
            base.allow_origin(origins)
        }
    }
}
