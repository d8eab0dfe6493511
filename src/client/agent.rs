use tracing::{debug, info, warn};

use super::connection::LiveConnection;
use crate::db::VersionStore;
use crate::models::{
    ClientMessage, Identity, JoinDocumentMessage, Member, SaveDocumentMessage, SendChangesMessage, ServerMessage,
    SyncError, VersionCursor,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Disconnected,
    Joining,
    Active,
    Saving,
    Navigating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A new version with this number was appended.
    Appended(u32),
    /// This existing version was overwritten.
    Updated(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Moved(u32),
    /// Already at the end in that direction
    Unchanged,
}

/// Something the server changed about the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    RemoteContent(String),
    MembersChanged(Vec<Member>),
    Rejected(SyncError),
    Disconnected,
}

/// Client side state machine for one editing session.
///
/// Live edits travel over the [`LiveConnection`]; saving and navigating the
/// history go to the [`VersionStore`]. Looking at an older version is a
/// private view change, nothing about it is sent to the room.
pub struct SyncAgent<S: VersionStore> {
    store: S,
    document_id: String,
    state: AgentState,
    identity: Option<Identity>,
    connection: Option<LiveConnection>,
    cursor: VersionCursor,
    content: String,
    members: Vec<Member>,
}

impl<S: VersionStore> SyncAgent<S> {
    pub fn new(store: S, document_id: impl Into<String>) -> Self {
        Self {
            store,
            document_id: document_id.into(),
            state: AgentState::Disconnected,
            identity: None,
            connection: None,
            cursor: VersionCursor::default(),
            content: String::new(),
            members: Vec::new(),
        }
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn cursor(&self) -> VersionCursor {
        self.cursor
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// Join the document's room and wait until the server loads it.
    ///
    /// Without an identity nothing is sent. A rejected credential is
    /// forgotten and leaves the agent disconnected.
    pub async fn join(&mut self, identity: Option<Identity>, connection: LiveConnection) -> Result<(), SyncError> {
        if self.state != AgentState::Disconnected {
            return Err(SyncError::InvalidState(format!("cannot join while {:?}", self.state)));
        }
        let identity = identity.ok_or_else(|| SyncError::Unauthorized("not logged in".to_string()))?;

        connection.send(ClientMessage::JoinDocument(JoinDocumentMessage {
            document_id: self.document_id.clone(),
            username: identity.username.clone(),
            credential: identity.token.clone(),
        }))?;
        info!("Joining document '{}' as '{}'", self.document_id, identity.username);
        self.identity = Some(identity);
        self.connection = Some(connection);
        self.state = AgentState::Joining;

        loop {
            let msg = match self.connection.as_mut() {
                Some(connection) => connection.recv().await,
                None => None,
            };
            match msg {
                Some(ServerMessage::LoadDocument(load)) => {
                    self.content = load.content;
                    self.members = load.users;
                    break;
                }
                Some(ServerMessage::Error(error)) => {
                    let error = error.into_sync_error();
                    warn!("Join of document '{}' rejected: {}", self.document_id, error);
                    if matches!(error, SyncError::Unauthorized(_)) {
                        self.identity = None;
                    }
                    self.disconnect().await;
                    return Err(error);
                }
                Some(other) => {
                    self.apply(other);
                }
                None => {
                    self.disconnect().await;
                    return Err(SyncError::TransportLost);
                }
            }
        }

        match self.store.count(&self.document_id).await {
            Ok(total) => {
                self.cursor = VersionCursor::at_tip(total);
                self.state = AgentState::Active;
                info!("Joined document '{}' at version {}", self.document_id, total);
                Ok(())
            }
            Err(e) => {
                warn!("Could not read the history of '{}': {}", self.document_id, e);
                self.disconnect().await;
                Err(e)
            }
        }
    }

    /// Share the local content with the room.
    pub fn edit(&mut self, content: impl Into<String>) -> Result<(), SyncError> {
        self.require_active()?;
        self.content = content.into();
        self.send(ClientMessage::SendChanges(SendChangesMessage {
            content: self.content.clone(),
        }))
    }

    /// Ask the server to rebroadcast the member list.
    pub fn refresh_members(&self) -> Result<(), SyncError> {
        self.require_active()?;
        self.send(ClientMessage::ForceUpdateUserList)
    }

    /// Wait for the next change coming from the server and apply it.
    pub async fn poll(&mut self) -> Option<AgentEvent> {
        loop {
            let msg = match self.connection.as_mut() {
                Some(connection) => connection.recv().await,
                None => return None,
            };
            match msg {
                Some(msg) => {
                    if let Some(event) = self.apply(msg) {
                        return Some(event);
                    }
                }
                None => {
                    warn!("Lost the connection to document '{}'", self.document_id);
                    self.disconnect().await;
                    return Some(AgentEvent::Disconnected);
                }
            }
        }
    }

    /// Apply one server message to the local view.
    pub fn apply(&mut self, msg: ServerMessage) -> Option<AgentEvent> {
        match msg {
            ServerMessage::ReceiveChanges(content) => {
                self.content = content.clone();
                Some(AgentEvent::RemoteContent(content))
            }
            ServerMessage::LoadDocument(load) => {
                self.members = load.users;
                self.content = load.content.clone();
                Some(AgentEvent::RemoteContent(load.content))
            }
            ServerMessage::UserList(members) => {
                if members == self.members {
                    debug!("Member list unchanged");
                    return None;
                }
                self.members = members.clone();
                Some(AgentEvent::MembersChanged(members))
            }
            ServerMessage::Error(error) => {
                let error = error.into_sync_error();
                warn!("Server rejected a request: {}", error);
                Some(AgentEvent::Rejected(error))
            }
        }
    }

    /// Save the local content.
    ///
    /// Viewing the latest version appends a new one. Viewing an older one
    /// overwrites it in place. The room hears about the save before the
    /// store is called, whatever the store answers.
    pub async fn save(&mut self) -> Result<SaveOutcome, SyncError> {
        self.require_active()?;
        self.state = AgentState::Saving;

        let at_tip = self.cursor.is_at_tip();
        let echo = ClientMessage::SaveDocument(SaveDocumentMessage {
            content: self.content.clone(),
            version: if at_tip { None } else { Some(self.cursor.current()) },
        });
        if let Err(e) = self.send(echo) {
            warn!("Could not announce the save to the room: {}", e);
        }

        let result = if at_tip {
            self.store
                .append_version(&self.document_id, &self.content)
                .await
                .map(|number| {
                    self.cursor.appended(number);
                    SaveOutcome::Appended(number)
                })
        } else {
            let number = self.cursor.current();
            self.store
                .update_version(&self.document_id, number, &self.content)
                .await
                .map(|_| SaveOutcome::Updated(number))
        };
        self.state = AgentState::Active;

        match &result {
            Ok(outcome) => info!("Saved document '{}': {:?}", self.document_id, outcome),
            Err(e) => warn!("Saving document '{}' failed: {}", self.document_id, e),
        }
        result
    }

    /// Show the next newer version.
    pub async fn next(&mut self) -> Result<Navigation, SyncError> {
        let target = self.cursor.next_target();
        self.navigate(target).await
    }

    /// Show the next older version.
    pub async fn back(&mut self) -> Result<Navigation, SyncError> {
        let target = self.cursor.back_target();
        self.navigate(target).await
    }

    async fn navigate(&mut self, target: Option<u32>) -> Result<Navigation, SyncError> {
        self.require_active()?;
        let Some(number) = target else {
            return Ok(Navigation::Unchanged);
        };

        self.state = AgentState::Navigating;
        let result = self.store.get_version(&self.document_id, number).await;
        self.state = AgentState::Active;

        let version = result?;
        self.content = version.content;
        self.cursor.move_to(number);
        debug!("Viewing version {} of '{}'", number, self.document_id);
        Ok(Navigation::Moved(number))
    }

    /// Leave the room, close the connection and forget the credential.
    pub async fn logout(&mut self) {
        if let Err(e) = self.send(ClientMessage::Logout) {
            debug!("Logout not delivered: {}", e);
        }
        self.identity = None;
        self.disconnect().await;
        info!("Logged out of document '{}'", self.document_id);
    }

    async fn disconnect(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.close().await;
        }
        self.members.clear();
        self.state = AgentState::Disconnected;
    }

    fn send(&self, msg: ClientMessage) -> Result<(), SyncError> {
        match &self.connection {
            Some(connection) => connection.send(msg),
            None => Err(SyncError::TransportLost),
        }
    }

    fn require_active(&self) -> Result<(), SyncError> {
        if self.state == AgentState::Active {
            Ok(())
        } else {
            Err(SyncError::InvalidState(format!("not active ({:?})", self.state)))
        }
    }
}
