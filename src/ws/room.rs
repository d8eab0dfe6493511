use indexmap::IndexMap;

use super::broadcaster::RoomChannel;
use crate::models::{ConnectionId, Identity, Member};

/// Live state of one document shared by everybody editing it.
pub struct Room {
    pub live_content: String,
    /// In join order
    pub members: IndexMap<ConnectionId, Identity>,
    pub channel: RoomChannel,
}

impl Room {
    pub fn new(seed: String, broadcast_capacity: usize) -> Self {
        Self {
            live_content: seed,
            members: IndexMap::new(),
            channel: RoomChannel::new(broadcast_capacity),
        }
    }

    pub fn member_list(&self) -> Vec<Member> {
        self.members.values().map(Identity::member).collect()
    }

    pub fn is_member(&self, connection_id: &ConnectionId) -> bool {
        self.members.contains_key(connection_id)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
