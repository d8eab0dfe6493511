use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// Identifies one live WebSocket connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Who a connection belongs to, as vouched for by the auth service.
///
/// Owned by exactly one connection and never shared with other members;
/// they only ever see the [`Member`] projection.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub token: String,
    pub color: String,
}

impl Identity {
    pub fn new(username: impl Into<String>, token: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
            color: color.into(),
        }
    }

    pub fn member(&self) -> Member {
        Member {
            username: self.username.clone(),
            color: self.color.clone(),
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .field("color", &self.color)
            .finish()
    }
}

/// Entry of a room's presence list.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, ToSchema)]
pub struct Member {
    pub username: String,
    pub color: String,
}

/// Stable display color for users whose token carries none.
pub fn color_for(username: &str) -> String {
    // FNV-1a, so the same name always gets the same color
    let hash = username
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325u64, |h, b| (h ^ b as u64).wrapping_mul(0x0100_0000_01b3));
    let r = (hash & 0xFF) as u8;
    let g = ((hash >> 8) & 0xFF) as u8;
    let b = ((hash >> 16) & 0xFF) as u8;
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}
