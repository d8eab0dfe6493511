use tracing::{debug, info};

use crate::models::{SaveDocumentMessage, SendChangesMessage, SyncError};
use crate::websocket::handler::Session;
use crate::AppState;

/// Handle SendChangesMessage
pub async fn handle_changes_message(
    changes_msg: SendChangesMessage,
    session: &Session,
    state: &AppState,
) -> Result<(), SyncError> {
    debug!(
        "Changes received for document {} from connection {} ({} bytes)",
        session.document_id,
        session.connection_id,
        changes_msg.content.len()
    );
    state
        .registry
        .apply_edit(&session.document_id, session.connection_id, changes_msg.content)
        .await
}

/// Handle SaveDocumentMessage
///
/// The saving client persists through the REST surface. Here the saved
/// content only becomes the room's live content.
pub async fn handle_save_message(
    save_msg: SaveDocumentMessage,
    session: &Session,
    state: &AppState,
) -> Result<(), SyncError> {
    match save_msg.version {
        Some(version) => info!(
            "Save of version {} announced for document {} by connection {}",
            version, session.document_id, session.connection_id
        ),
        None => info!(
            "Save announced for document {} by connection {}",
            session.document_id, session.connection_id
        ),
    }
    state
        .registry
        .apply_edit(&session.document_id, session.connection_id, save_msg.content)
        .await
}
