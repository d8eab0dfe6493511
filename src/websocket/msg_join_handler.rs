use tracing::info;

use crate::db::latest_content;
use crate::models::{ConnectionId, JoinDocumentMessage, SyncError};
use crate::ws::JoinedRoom;
use crate::AppState;

/// Handle JoinDocumentMessage
///
/// The credential is checked before anything else. A room that is not open
/// yet starts from the newest saved version.
pub async fn handle_join_message(
    join_msg: &JoinDocumentMessage,
    connection_id: ConnectionId,
    state: &AppState,
) -> Result<JoinedRoom, SyncError> {
    let document_id = state.config.document_or_default(Some(&join_msg.document_id));
    info!(
        "Join message received for document {}: user={}, connection={}",
        document_id, join_msg.username, connection_id
    );

    let identity = state
        .authenticator
        .authenticate(&join_msg.username, &join_msg.credential)?;

    if let Some(joined) = state
        .registry
        .join_open_room(&document_id, connection_id, identity.clone())
        .await
    {
        return Ok(joined);
    }

    let seed = latest_content(state.store.as_ref(), &document_id).await?;
    state
        .registry
        .join_verified(&document_id, connection_id, identity, seed.unwrap_or_default())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::JwtAuthenticator;
    use crate::config::Config;
    use crate::db::{InMemoryVersionStore, VersionStore};
    use crate::models::Version;
    use crate::services::auth_service::issue_token;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    const SECRET: &str = "join-secret";

    /// Every call fails as if the database were unreachable.
    struct DownStore;

    #[async_trait]
    impl VersionStore for DownStore {
        async fn append_version(&self, _: &str, _: &str) -> Result<u32, SyncError> {
            Err(SyncError::StorageUnavailable("down".to_string()))
        }

        async fn update_version(&self, _: &str, _: u32, _: &str) -> Result<(), SyncError> {
            Err(SyncError::StorageUnavailable("down".to_string()))
        }

        async fn get_version(&self, _: &str, _: u32) -> Result<Version, SyncError> {
            Err(SyncError::StorageUnavailable("down".to_string()))
        }

        async fn count(&self, _: &str) -> Result<u32, SyncError> {
            Err(SyncError::StorageUnavailable("down".to_string()))
        }
    }

    fn state(store: Arc<dyn VersionStore>) -> AppState {
        let authenticator = Arc::new(JwtAuthenticator::new(SECRET, Duration::from_secs(60)));
        AppState::new(Config::default(), store, authenticator)
    }

    fn join_msg(username: &str, credential: &str) -> JoinDocumentMessage {
        JoinDocumentMessage {
            document_id: "global".to_string(),
            username: username.to_string(),
            credential: credential.to_string(),
        }
    }

    #[tokio::test]
    async fn forged_credential_is_refused_before_storage_is_read() {
        let state = state(Arc::new(DownStore));
        let result = handle_join_message(&join_msg("eve", "forged"), ConnectionId::new(), &state).await;
        assert!(matches!(result, Err(SyncError::Unauthorized(_))));
        assert_eq!(state.registry.stats().await, (0, 0));
    }

    #[tokio::test]
    async fn storage_failure_on_a_closed_room_fails_the_join() {
        let state = state(Arc::new(DownStore));
        let token = issue_token(SECRET, "alice", None, 60).unwrap();
        let result = handle_join_message(&join_msg("alice", &token), ConnectionId::new(), &state).await;
        assert!(matches!(result, Err(SyncError::StorageUnavailable(_))));
        assert_eq!(state.registry.stats().await, (0, 0));
    }

    #[tokio::test]
    async fn open_room_is_joined_without_touching_storage() {
        let state = state(Arc::new(DownStore));
        let alice = issue_token(SECRET, "alice", None, 60).unwrap();
        state
            .registry
            .join("global", ConnectionId::new(), "alice", &alice, Some("live".to_string()))
            .await
            .unwrap();

        let bob = issue_token(SECRET, "bob", None, 60).unwrap();
        let joined = handle_join_message(&join_msg("bob", &bob), ConnectionId::new(), &state)
            .await
            .unwrap();
        assert_eq!(joined.content, "live");
        assert_eq!(joined.members.len(), 2);
    }

    #[tokio::test]
    async fn reopened_room_is_seeded_from_the_latest_version() {
        let store = Arc::new(InMemoryVersionStore::new());
        store.append_version("global", "# One").await.unwrap();
        store.append_version("global", "# Two").await.unwrap();
        let state = state(store);
        let token = issue_token(SECRET, "alice", None, 60).unwrap();

        let first = ConnectionId::new();
        handle_join_message(&join_msg("alice", &token), first, &state).await.unwrap();
        state.registry.apply_edit("global", first, "unsaved".to_string()).await.unwrap();
        state.registry.leave(first).await;

        let joined = handle_join_message(&join_msg("alice", &token), ConnectionId::new(), &state)
            .await
            .unwrap();
        assert_eq!(joined.content, "# Two");
    }
}
