//! Live channel protocol. Frames are JSON objects `{"event": <name>, "data": <payload>}`.

use serde::{Deserialize, Serialize};

use crate::models::{Member, SyncError};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JoinDocumentMessage {
    #[serde(default)]
    pub document_id: String,
    pub username: String,
    #[serde(alias = "token")]
    pub credential: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SendChangesMessage {
    pub content: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SaveDocumentMessage {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LoadDocumentMessage {
    pub content: String,
    pub users: Vec<Member>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Unauthorized,
    NotFound,
    StorageUnavailable,
    TransportLost,
    InvalidState,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessage {
    pub kind: ErrorKind,
    pub message: String,
    /// Set for `not-found`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

impl From<&SyncError> for ErrorMessage {
    fn from(error: &SyncError) -> Self {
        let kind = match error {
            SyncError::Unauthorized(_) => ErrorKind::Unauthorized,
            SyncError::NotFound { .. } => ErrorKind::NotFound,
            SyncError::StorageUnavailable(_) => ErrorKind::StorageUnavailable,
            SyncError::TransportLost => ErrorKind::TransportLost,
            SyncError::InvalidState(_) => ErrorKind::InvalidState,
        };
        let (document, version) = match error {
            SyncError::NotFound { document, version } => (Some(document.clone()), Some(*version)),
            _ => (None, None),
        };
        Self { kind, message: error.to_string(), document, version }
    }
}

impl ErrorMessage {
    pub fn into_sync_error(self) -> SyncError {
        match self.kind {
            ErrorKind::Unauthorized => SyncError::Unauthorized(self.message),
            ErrorKind::StorageUnavailable => SyncError::StorageUnavailable(self.message),
            ErrorKind::TransportLost => SyncError::TransportLost,
            ErrorKind::NotFound => match (self.document, self.version) {
                (Some(document), Some(version)) => SyncError::NotFound { document, version },
                _ => SyncError::InvalidState(self.message),
            },
            ErrorKind::InvalidState => SyncError::InvalidState(self.message),
        }
    }
}

/// Everything a client may send over the live channel.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "event", content = "data")]
pub enum ClientMessage {
    #[serde(rename = "join-document")]
    JoinDocument(JoinDocumentMessage),
    #[serde(rename = "send-changes")]
    SendChanges(SendChangesMessage),
    #[serde(rename = "force-update-user-list")]
    ForceUpdateUserList,
    #[serde(rename = "save-document")]
    SaveDocument(SaveDocumentMessage),
    #[serde(rename = "logout")]
    Logout,
}

/// Everything the server pushes to a client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "event", content = "data")]
pub enum ServerMessage {
    #[serde(rename = "load-document")]
    LoadDocument(LoadDocumentMessage),
    #[serde(rename = "receive-changes")]
    ReceiveChanges(String),
    #[serde(rename = "user-list")]
    UserList(Vec<Member>),
    #[serde(rename = "error")]
    Error(ErrorMessage),
}

impl ServerMessage {
    pub fn error(error: &SyncError) -> Self {
        ServerMessage::Error(ErrorMessage::from(error))
    }
}
