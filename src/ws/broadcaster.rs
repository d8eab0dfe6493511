//! Fan-out of room events to the connections subscribed to a room.
//!
//! Each room owns one tokio broadcast channel. Content changes carry their
//! origin so a subscriber never hears its own edit back; membership changes
//! go to everybody.

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};

use crate::models::{ConnectionId, Member, ServerMessage};

#[derive(Debug, Clone)]
pub enum RoomEvent {
    ContentChanged { origin: ConnectionId, content: String },
    MembersChanged(Vec<Member>),
}

/// Sending half of a room's event stream.
pub struct RoomChannel {
    sender: broadcast::Sender<RoomEvent>,
}

impl RoomChannel {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish_content(&self, origin: ConnectionId, content: String) -> usize {
        self.publish(RoomEvent::ContentChanged { origin, content })
    }

    pub fn publish_members(&self, members: Vec<Member>) -> usize {
        self.publish(RoomEvent::MembersChanged(members))
    }

    /// Fire and forget. Returns the number of subscribers reached.
    fn publish(&self, event: RoomEvent) -> usize {
        match self.sender.send(event) {
            Ok(n) => n,
            Err(_) => {
                debug!("Room event dropped, nobody is subscribed");
                0
            }
        }
    }

    pub fn subscribe(&self, connection_id: ConnectionId) -> Subscription {
        Subscription {
            connection_id,
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// One connection's view of a room's event stream.
pub struct Subscription {
    connection_id: ConnectionId,
    receiver: broadcast::Receiver<RoomEvent>,
}

impl Subscription {
    /// Next message for this connection, `None` once the room is gone.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if let Some(msg) = self.filter(event) {
                        return Some(msg);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Connection {} lagged behind, skipped {} room events", self.connection_id, skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Like [`Subscription::recv`] but returns `None` instead of waiting.
    pub fn try_recv(&mut self) -> Option<ServerMessage> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if let Some(msg) = self.filter(event) {
                        return Some(msg);
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!("Connection {} lagged behind, skipped {} room events", self.connection_id, skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    fn filter(&self, event: RoomEvent) -> Option<ServerMessage> {
        match event {
            RoomEvent::ContentChanged { origin, .. } if origin == self.connection_id => None,
            RoomEvent::ContentChanged { content, .. } => Some(ServerMessage::ReceiveChanges(content)),
            RoomEvent::MembersChanged(members) => Some(ServerMessage::UserList(members)),
        }
    }
}
