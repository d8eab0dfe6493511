use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
    Json,
};
use tracing::{debug, error};

use crate::models::ErrorResponse;
use crate::services::auth_service::get_auth_token;
use crate::AppState;

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    // 1. Get the auth token from the request
    let token = match get_auth_token(&req) {
        Ok(token) => token,
        Err(e) => {
            debug!("Rejecting request to {}: {}", req.uri().path(), e);
            return Err(ErrorResponse::with_status(StatusCode::UNAUTHORIZED, e));
        }
    };

    // 2. Validate token and resolve the identity
    let identity = match state.authenticator.verify(&token) {
        Ok(identity) => identity,
        Err(e) => {
            error!("Token validation failed: {}", e);
            return Err(e.to_error_response());
        }
    };

    // 3. Hand the identity to downstream handlers
    debug!("Request to {} by '{}'", req.uri().path(), identity.username);
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}
