use axum::{
    extract::{ws::{Message, WebSocket, WebSocketUpgrade}, State},
    response::Response,
};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::models::{ClientMessage, ConnectionId, LoadDocumentMessage, ServerMessage, SyncError};
use crate::websocket::msg_changes_handler::{handle_changes_message, handle_save_message};
use crate::websocket::msg_join_handler::handle_join_message;
use crate::websocket::msg_presence_handler::{handle_logout_message, handle_user_list_request};
use crate::ws::{JoinedRoom, SessionRegistry, Subscription};
use crate::AppState;

pub type WsSender = SplitSink<WebSocket, Message>;

/// Room membership of one live connection.
pub struct Session {
    pub connection_id: ConnectionId,
    pub document_id: String,
    pub subscription: Subscription,
}

/// Removes the connection from its room however the socket task ends.
struct LeaveOnDrop {
    registry: Arc<SessionRegistry>,
    connection_id: ConnectionId,
}

impl Drop for LeaveOnDrop {
    fn drop(&mut self) {
        let registry = self.registry.clone();
        let connection_id = self.connection_id;
        tokio::spawn(async move {
            registry.leave(connection_id).await;
        });
    }
}

/// WebSocket handler
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    info!("New WebSocket connection attempt");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    // Generate unique connection ID to identify this client
    let connection_id = ConnectionId::new();
    info!("WebSocket connection established with connection_id: {}", connection_id);

    let (mut sender, mut receiver) = socket.split();
    let _guard = LeaveOnDrop {
        registry: state.registry.clone(),
        connection_id,
    };

    // Nothing but a join is accepted until the connection sits in a room
    let mut session = match wait_for_join(&mut sender, &mut receiver, connection_id, &state).await {
        Some(session) => session,
        None => {
            info!("WebSocket connection {} closed before joining", connection_id);
            return;
        }
    };

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        warn!("Transport lost on connection {}: {}", connection_id, e);
                        break;
                    }
                    Some(Ok(_)) => continue,
                };
                let Some(msg) = parse_client_message(&text, connection_id) else {
                    continue;
                };

                match msg {
                    ClientMessage::JoinDocument(join_msg) => {
                        match handle_join_message(&join_msg, connection_id, &state).await {
                            Ok(joined) => {
                                let load = load_message(&joined);
                                session.document_id = joined.document_id;
                                session.subscription = joined.subscription;
                                if send_message(&mut sender, &load).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                if send_error(&mut sender, &e).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    ClientMessage::SendChanges(changes_msg) => {
                        if let Err(e) = handle_changes_message(changes_msg, &session, &state).await {
                            if send_error(&mut sender, &e).await.is_err() {
                                break;
                            }
                        }
                    }
                    ClientMessage::SaveDocument(save_msg) => {
                        if let Err(e) = handle_save_message(save_msg, &session, &state).await {
                            if send_error(&mut sender, &e).await.is_err() {
                                break;
                            }
                        }
                    }
                    ClientMessage::ForceUpdateUserList => {
                        handle_user_list_request(&session, &state).await;
                    }
                    ClientMessage::Logout => {
                        handle_logout_message(&session, &state).await;
                        break;
                    }
                }
            }
            event = session.subscription.recv() => {
                match event {
                    Some(msg) => {
                        if send_message(&mut sender, &msg).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        warn!("Room '{}' went away under connection {}", session.document_id, connection_id);
                        break;
                    }
                }
            }
        }
    }

    state.registry.leave(connection_id).await;
    let _ = sender.close().await;
    info!("WebSocket connection {} terminated", connection_id);
}

async fn wait_for_join(
    sender: &mut WsSender,
    receiver: &mut SplitStream<WebSocket>,
    connection_id: ConnectionId,
    state: &AppState,
) -> Option<Session> {
    while let Some(incoming) = receiver.next().await {
        let text = match incoming {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => return None,
            Ok(_) => continue,
            Err(e) => {
                warn!("Transport lost on connection {}: {}", connection_id, e);
                return None;
            }
        };

        match parse_client_message(&text, connection_id) {
            Some(ClientMessage::JoinDocument(join_msg)) => {
                match handle_join_message(&join_msg, connection_id, state).await {
                    Ok(joined) => {
                        let load = load_message(&joined);
                        send_message(sender, &load).await.ok()?;
                        return Some(Session {
                            connection_id,
                            document_id: joined.document_id,
                            subscription: joined.subscription,
                        });
                    }
                    Err(e) => {
                        // A failed join ends the connection
                        let _ = send_error(sender, &e).await;
                        let _ = sender.close().await;
                        return None;
                    }
                }
            }
            Some(other) => {
                warn!("Ignoring {:?} from connection {} before join", other, connection_id);
            }
            None => {}
        }
    }
    None
}

fn load_message(joined: &JoinedRoom) -> ServerMessage {
    ServerMessage::LoadDocument(LoadDocumentMessage {
        content: joined.content.clone(),
        users: joined.members.clone(),
    })
}

fn parse_client_message(text: &str, connection_id: ConnectionId) -> Option<ClientMessage> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => Some(msg),
        Err(e) => {
            error!("Failed to parse message from connection {}: {}", connection_id, e);
            None
        }
    }
}

/// Serialize and send one message to the client.
pub async fn send_message(sender: &mut WsSender, msg: &ServerMessage) -> Result<(), SyncError> {
    let text = serde_json::to_string(msg).map_err(|e| SyncError::InvalidState(e.to_string()))?;
    sender.send(Message::Text(text)).await.map_err(|e| {
        warn!("Failed to send message: {}", e);
        SyncError::TransportLost
    })
}

async fn send_error(sender: &mut WsSender, error: &SyncError) -> Result<(), SyncError> {
    warn!("Replying with error: {}", error);
    send_message(sender, &ServerMessage::error(error)).await
}
