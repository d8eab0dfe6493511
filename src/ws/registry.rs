use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use super::broadcaster::Subscription;
use super::room::Room;
use crate::auth::Authenticator;
use crate::models::{ConnectionId, Identity, Member, SyncError};

struct RoomEntry {
    room: Arc<Mutex<Room>>,
    /// Connections routed to this room, including ones still being admitted
    connections: usize,
}

#[derive(Default)]
struct RoomIndex {
    by_document: HashMap<String, RoomEntry>,
    by_connection: HashMap<ConnectionId, String>,
}

impl RoomIndex {
    fn occupy(&mut self, doc_id: &str) {
        if let Some(entry) = self.by_document.get_mut(doc_id) {
            entry.connections += 1;
        }
    }

    /// Drop one connection from a room, closing the room when none are left.
    fn release(&mut self, doc_id: &str) -> Option<Arc<Mutex<Room>>> {
        let entry = self.by_document.get_mut(doc_id)?;
        entry.connections = entry.connections.saturating_sub(1);
        let room = entry.room.clone();
        if entry.connections == 0 {
            self.by_document.remove(doc_id);
            info!("Closing room for document '{}', last member left", doc_id);
        }
        Some(room)
    }
}

/// What a connection gets back when it is admitted to a room.
pub struct JoinedRoom {
    pub document_id: String,
    pub identity: Identity,
    pub content: String,
    pub members: Vec<Member>,
    pub subscription: Subscription,
}

/// Rooms by document, and which room each connection sits in.
///
/// The index lock is released before any room lock is taken, so a busy room
/// never holds up the others. Room events are published while the room lock
/// is held, so each room's subscribers see mutations in the order they
/// happened.
pub struct SessionRegistry {
    authenticator: Arc<dyn Authenticator>,
    broadcast_capacity: usize,
    index: RwLock<RoomIndex>,
}

impl SessionRegistry {
    pub fn new(authenticator: Arc<dyn Authenticator>, broadcast_capacity: usize) -> Self {
        Self {
            authenticator,
            broadcast_capacity,
            index: RwLock::new(RoomIndex::default()),
        }
    }

    /// Admit a connection to a room, creating the room from `seed` if needed.
    ///
    /// A rejected credential leaves every room untouched. A connection that
    /// already sits in another room leaves it first.
    pub async fn join(
        &self,
        doc_id: &str,
        connection_id: ConnectionId,
        username: &str,
        credential: &str,
        seed: Option<String>,
    ) -> Result<JoinedRoom, SyncError> {
        let identity = self.authenticator.authenticate(username, credential)?;
        self.join_verified(doc_id, connection_id, identity, seed.unwrap_or_default())
            .await
    }

    /// Same as [`SessionRegistry::join`] for an identity that was already checked.
    pub async fn join_verified(
        &self,
        doc_id: &str,
        connection_id: ConnectionId,
        identity: Identity,
        seed: String,
    ) -> Result<JoinedRoom, SyncError> {
        self.admit(doc_id, connection_id, identity, Some(seed))
            .await
            .ok_or_else(|| SyncError::InvalidState(format!("could not open a room for document '{}'", doc_id)))
    }

    /// Admit a checked identity only if the room is already open.
    ///
    /// `None` means nothing changed; the caller loads a seed and uses
    /// [`SessionRegistry::join_verified`].
    pub async fn join_open_room(
        &self,
        doc_id: &str,
        connection_id: ConnectionId,
        identity: Identity,
    ) -> Option<JoinedRoom> {
        self.admit(doc_id, connection_id, identity, None).await
    }

    async fn admit(
        &self,
        doc_id: &str,
        connection_id: ConnectionId,
        identity: Identity,
        seed: Option<String>,
    ) -> Option<JoinedRoom> {
        let (room, left) = {
            let mut index = self.index.write().await;
            let room = match index.by_document.get(doc_id) {
                Some(entry) => entry.room.clone(),
                None => {
                    let seed = seed?;
                    info!("Opening room for document '{}'", doc_id);
                    let room = Arc::new(Mutex::new(Room::new(seed, self.broadcast_capacity)));
                    index.by_document.insert(
                        doc_id.to_string(),
                        RoomEntry { room: room.clone(), connections: 0 },
                    );
                    room
                }
            };

            let left = match index.by_connection.insert(connection_id, doc_id.to_string()) {
                Some(previous) if previous == doc_id => None,
                previous => {
                    index.occupy(doc_id);
                    previous.and_then(|previous| index.release(&previous).map(|room| (previous, room)))
                }
            };
            (room, left)
        };

        if let Some((previous, old_room)) = left {
            Self::remove_member(&old_room, &previous, connection_id).await;
        }

        let mut room = room.lock().await;
        room.members.insert(connection_id, identity.clone());
        let subscription = room.channel.subscribe(connection_id);
        let members = room.member_list();
        room.channel.publish_members(members.clone());

        info!(
            "'{}' joined document '{}' on connection {} ({} members)",
            identity.username,
            doc_id,
            connection_id,
            members.len()
        );

        Some(JoinedRoom {
            document_id: doc_id.to_string(),
            identity,
            content: room.live_content.clone(),
            members,
            subscription,
        })
    }

    /// Remove a connection from its room. Returns false when it was in none.
    pub async fn leave(&self, connection_id: ConnectionId) -> bool {
        let released = {
            let mut index = self.index.write().await;
            match index.by_connection.remove(&connection_id) {
                Some(doc_id) => index.release(&doc_id).map(|room| (doc_id, room)),
                None => None,
            }
        };
        match released {
            Some((doc_id, room)) => Self::remove_member(&room, &doc_id, connection_id).await,
            None => {
                debug!("Connection {} left without being in a room", connection_id);
                false
            }
        }
    }

    async fn remove_member(room: &Mutex<Room>, doc_id: &str, connection_id: ConnectionId) -> bool {
        let mut room = room.lock().await;
        let Some(identity) = room.members.shift_remove(&connection_id) else {
            return false;
        };
        if !room.is_empty() {
            room.channel.publish_members(room.member_list());
        }
        info!("'{}' left document '{}'", identity.username, doc_id);
        true
    }

    fn missing_room(doc_id: &str) -> SyncError {
        SyncError::InvalidState(format!("no open room for document '{}'", doc_id))
    }

    async fn room(&self, doc_id: &str) -> Option<Arc<Mutex<Room>>> {
        self.index.read().await.by_document.get(doc_id).map(|entry| entry.room.clone())
    }

    /// Replace the live content and relay it to every other member.
    pub async fn apply_edit(
        &self,
        doc_id: &str,
        connection_id: ConnectionId,
        content: String,
    ) -> Result<(), SyncError> {
        let room = self.room(doc_id).await.ok_or_else(|| Self::missing_room(doc_id))?;

        let mut room = room.lock().await;
        if !room.is_member(&connection_id) {
            return Err(SyncError::InvalidState(format!(
                "connection {} is not a member of document '{}'",
                connection_id, doc_id
            )));
        }

        room.live_content = content.clone();
        let reached = room.channel.publish_content(connection_id, content);
        debug!("Edit on document '{}' relayed to {} subscribers", doc_id, reached.saturating_sub(1));
        Ok(())
    }

    pub async fn members(&self, doc_id: &str) -> Vec<Member> {
        match self.room(doc_id).await {
            Some(room) => room.lock().await.member_list(),
            None => Vec::new(),
        }
    }

    /// Rebroadcast the member list of a room. Returns false when there is no room.
    pub async fn announce_members(&self, doc_id: &str) -> bool {
        match self.room(doc_id).await {
            Some(room) => {
                let room = room.lock().await;
                room.channel.publish_members(room.member_list());
                true
            }
            None => false,
        }
    }

    pub async fn live_content(&self, doc_id: &str) -> Option<String> {
        match self.room(doc_id).await {
            Some(room) => Some(room.lock().await.live_content.clone()),
            None => None,
        }
    }

    /// Open rooms and admitted connections.
    pub async fn stats(&self) -> (usize, usize) {
        let index = self.index.read().await;
        (index.by_document.len(), index.by_connection.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{color_for, ServerMessage};

    /// Accepts `token-<username>` credentials.
    struct StaticAuthenticator;

    impl Authenticator for StaticAuthenticator {
        fn verify(&self, credential: &str) -> Result<Identity, SyncError> {
            match credential.strip_prefix("token-") {
                Some(name) if !name.is_empty() => Ok(Identity::new(name, credential, color_for(name))),
                _ => Err(SyncError::Unauthorized("bad token".to_string())),
            }
        }
    }

    fn registry() -> SessionRegistry {
        SessionRegistry::new(Arc::new(StaticAuthenticator), 16)
    }

    async fn join(registry: &SessionRegistry, conn: ConnectionId, name: &str) -> JoinedRoom {
        registry
            .join("global", conn, name, &format!("token-{}", name), None)
            .await
            .unwrap()
    }

    fn names(members: &[Member]) -> Vec<&str> {
        members.iter().map(|m| m.username.as_str()).collect()
    }

    #[tokio::test]
    async fn first_join_seeds_the_room() {
        let registry = registry();
        let conn = ConnectionId::new();
        let joined = registry
            .join("global", conn, "alice", "token-alice", Some("# Saved".to_string()))
            .await
            .unwrap();
        assert_eq!(joined.content, "# Saved");
        assert_eq!(names(&joined.members), vec!["alice"]);

        // The seed only matters when the room is created
        let other = registry
            .join("global", ConnectionId::new(), "bob", "token-bob", Some("ignored".to_string()))
            .await
            .unwrap();
        assert_eq!(other.content, "# Saved");
    }

    #[tokio::test]
    async fn joiner_and_members_receive_the_new_list() {
        let registry = registry();
        let (a, b) = (ConnectionId::new(), ConnectionId::new());
        let mut alice = join(&registry, a, "alice").await;
        assert!(matches!(alice.subscription.try_recv(), Some(ServerMessage::UserList(m)) if names(&m) == ["alice"]));

        let mut bob = join(&registry, b, "bob").await;
        assert_eq!(names(&bob.members), vec!["alice", "bob"]);
        assert!(matches!(alice.subscription.try_recv(), Some(ServerMessage::UserList(m)) if names(&m) == ["alice", "bob"]));
        assert!(matches!(bob.subscription.try_recv(), Some(ServerMessage::UserList(m)) if names(&m) == ["alice", "bob"]));
    }

    #[tokio::test]
    async fn unauthorized_join_leaves_the_room_untouched() {
        let registry = registry();
        let mut alice = join(&registry, ConnectionId::new(), "alice").await;
        alice.subscription.try_recv();

        let result = registry.join("global", ConnectionId::new(), "eve", "forged", None).await;
        assert!(matches!(result, Err(SyncError::Unauthorized(_))));

        let mismatched = registry.join("global", ConnectionId::new(), "eve", "token-alice", None).await;
        assert!(matches!(mismatched, Err(SyncError::Unauthorized(_))));

        assert_eq!(names(&registry.members("global").await), vec!["alice"]);
        assert_eq!(alice.subscription.try_recv(), None);
        assert_eq!(registry.stats().await, (1, 1));
    }

    #[tokio::test]
    async fn edits_reach_everyone_but_the_editor() {
        let registry = registry();
        let (a, b, c) = (ConnectionId::new(), ConnectionId::new(), ConnectionId::new());
        let mut alice = join(&registry, a, "alice").await;
        let mut bob = join(&registry, b, "bob").await;
        let mut carol = join(&registry, c, "carol").await;
        for sub in [&mut alice.subscription, &mut bob.subscription, &mut carol.subscription] {
            while sub.try_recv().is_some() {}
        }

        registry.apply_edit("global", a, "# Hello".to_string()).await.unwrap();

        let expected = Some(ServerMessage::ReceiveChanges("# Hello".to_string()));
        assert_eq!(bob.subscription.try_recv(), expected);
        assert_eq!(carol.subscription.try_recv(), expected);
        assert_eq!(alice.subscription.try_recv(), None);
        assert_eq!(registry.live_content("global").await.as_deref(), Some("# Hello"));
    }

    #[tokio::test]
    async fn later_edit_wins() {
        let registry = registry();
        let (a, b) = (ConnectionId::new(), ConnectionId::new());
        let mut alice = join(&registry, a, "alice").await;
        let _bob = join(&registry, b, "bob").await;
        while alice.subscription.try_recv().is_some() {}

        registry.apply_edit("global", a, "from alice".to_string()).await.unwrap();
        registry.apply_edit("global", b, "from bob".to_string()).await.unwrap();

        assert_eq!(registry.live_content("global").await.as_deref(), Some("from bob"));
        assert_eq!(alice.subscription.try_recv(), Some(ServerMessage::ReceiveChanges("from bob".to_string())));
    }

    #[tokio::test]
    async fn edits_from_outsiders_are_rejected() {
        let registry = registry();
        let _alice = join(&registry, ConnectionId::new(), "alice").await;

        let stranger = ConnectionId::new();
        let result = registry.apply_edit("global", stranger, "spam".to_string()).await;
        assert!(matches!(result, Err(SyncError::InvalidState(_))));
        let result = registry.apply_edit("elsewhere", stranger, "spam".to_string()).await;
        assert!(matches!(result, Err(SyncError::InvalidState(_))));
        assert_eq!(registry.live_content("global").await.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn join_then_leave_restores_membership() {
        let registry = registry();
        let (a, b) = (ConnectionId::new(), ConnectionId::new());
        let mut alice = join(&registry, a, "alice").await;
        let before = registry.members("global").await;

        let _bob = join(&registry, b, "bob").await;
        assert!(registry.leave(b).await);
        assert!(!registry.leave(b).await);

        assert_eq!(registry.members("global").await, before);
        let mut last = None;
        while let Some(msg) = alice.subscription.try_recv() {
            last = Some(msg);
        }
        assert!(matches!(last, Some(ServerMessage::UserList(m)) if names(&m) == ["alice"]));
    }

    #[tokio::test]
    async fn room_closes_with_its_last_member() {
        let registry = registry();
        let a = ConnectionId::new();
        let _alice = join(&registry, a, "alice").await;
        registry.apply_edit("global", a, "unsaved".to_string()).await.unwrap();

        registry.leave(a).await;
        assert_eq!(registry.live_content("global").await, None);
        assert_eq!(registry.stats().await, (0, 0));

        let again = registry
            .join("global", a, "alice", "token-alice", Some("persisted".to_string()))
            .await
            .unwrap();
        assert_eq!(again.content, "persisted");
    }

    #[tokio::test]
    async fn joining_another_document_leaves_the_first() {
        let registry = registry();
        let (a, b) = (ConnectionId::new(), ConnectionId::new());
        let _alice = join(&registry, a, "alice").await;
        let _bob = join(&registry, b, "bob").await;

        registry.join("notes", a, "alice", "token-alice", None).await.unwrap();

        assert_eq!(names(&registry.members("global").await), vec!["bob"]);
        assert_eq!(names(&registry.members("notes").await), vec!["alice"]);
        assert_eq!(registry.stats().await, (2, 2));
    }

    #[tokio::test]
    async fn announce_rebroadcasts_current_members() {
        let registry = registry();
        let mut alice = join(&registry, ConnectionId::new(), "alice").await;
        alice.subscription.try_recv();

        assert!(registry.announce_members("global").await);
        assert!(matches!(alice.subscription.try_recv(), Some(ServerMessage::UserList(m)) if names(&m) == ["alice"]));
        assert!(!registry.announce_members("nowhere").await);
    }

    #[tokio::test]
    async fn rooms_are_independent() {
        let registry = registry();
        let (a, b) = (ConnectionId::new(), ConnectionId::new());
        let _alice = join(&registry, a, "alice").await;
        let mut bob = registry.join("notes", b, "bob", "token-bob", None).await.unwrap();
        bob.subscription.try_recv();

        registry.apply_edit("global", a, "global edit".to_string()).await.unwrap();
        assert_eq!(bob.subscription.try_recv(), None);
        assert_eq!(registry.live_content("notes").await.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn open_room_join_never_creates_a_room() {
        let registry = registry();
        let a = ConnectionId::new();
        let _alice = join(&registry, a, "alice").await;
        registry.apply_edit("global", a, "live".to_string()).await.unwrap();

        let b = ConnectionId::new();
        let bob = Identity::new("bob", "token-bob", color_for("bob"));
        let joined = registry.join_open_room("global", b, bob).await.unwrap();
        assert_eq!(joined.content, "live");

        // The room closes between the caller's check and its join
        registry.leave(a).await;
        registry.leave(b).await;
        let carol = Identity::new("carol", "token-carol", color_for("carol"));
        assert!(registry.join_open_room("global", ConnectionId::new(), carol).await.is_none());
        assert_eq!(registry.stats().await, (0, 0));
        assert_eq!(registry.live_content("global").await, None);
    }

    #[tokio::test]
    async fn failed_open_room_join_keeps_the_current_room() {
        let registry = registry();
        let a = ConnectionId::new();
        let alice = join(&registry, a, "alice").await;

        assert!(registry.join_open_room("notes", a, alice.identity.clone()).await.is_none());
        assert_eq!(names(&registry.members("global").await), vec!["alice"]);
        assert_eq!(registry.stats().await, (1, 1));
    }

    #[tokio::test]
    async fn busy_room_does_not_block_joins_elsewhere() {
        let registry = Arc::new(registry());
        let _alice = join(&registry, ConnectionId::new(), "alice").await;

        let global = registry.room("global").await.unwrap();
        let held = global.lock().await;

        let waiting = {
            let registry = registry.clone();
            tokio::spawn(async move { join(&registry, ConnectionId::new(), "bob").await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let joined = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            registry.join("notes", ConnectionId::new(), "carol", "token-carol", None),
        )
        .await
        .expect("join into another room was blocked")
        .unwrap();
        assert_eq!(names(&joined.members), vec!["carol"]);

        drop(held);
        let bob = waiting.await.unwrap();
        assert_eq!(names(&bob.members), vec!["alice", "bob"]);
    }
}
