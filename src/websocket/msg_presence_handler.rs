use tracing::info;

use crate::websocket::handler::Session;
use crate::AppState;

/// Handle a force-update-user-list request
pub async fn handle_user_list_request(session: &Session, state: &AppState) {
    info!("User list requested for document {} by connection {}", session.document_id, session.connection_id);
    state.registry.announce_members(&session.document_id).await;
}

/// Handle a logout message
pub async fn handle_logout_message(session: &Session, state: &AppState) {
    info!("Logout on connection {} in document {}", session.connection_id, session.document_id);
    state.registry.leave(session.connection_id).await;
}
