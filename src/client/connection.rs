use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::models::{ClientMessage, ServerMessage, SyncError};

/// The one live channel a client keeps open for its whole editing session.
///
/// A writer task drains outgoing messages into the socket and a reader
/// task decodes incoming frames, so sending never waits on the network.
pub struct LiveConnection {
    outgoing: Option<mpsc::UnboundedSender<ClientMessage>>,
    incoming: mpsc::UnboundedReceiver<ServerMessage>,
    writer: Option<JoinHandle<()>>,
    reader: Option<JoinHandle<()>>,
}

impl LiveConnection {
    /// Open a WebSocket to `url`, e.g. `ws://127.0.0.1:3000/ws`.
    pub async fn connect(url: &str) -> Result<Self, SyncError> {
        let (stream, _) = connect_async(url).await.map_err(|e| {
            warn!("Failed to connect to {}: {}", url, e);
            SyncError::TransportLost
        })?;
        info!("Connected to {}", url);

        let (mut write, mut read) = stream.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ClientMessage>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<ServerMessage>();

        let writer = tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("Failed to encode {:?}: {}", msg, e);
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::Text(json.into())).await {
                    warn!("Send failed, closing writer: {}", e);
                    return;
                }
            }
            let _ = write.close().await;
        });

        let reader = tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(text.as_str()) {
                        Ok(msg) => {
                            if in_tx.send(msg).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Skipping malformed server message: {}", e),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Connection lost: {}", e);
                        break;
                    }
                }
            }
            debug!("Reader finished");
        });

        Ok(Self {
            outgoing: Some(out_tx),
            incoming: in_rx,
            writer: Some(writer),
            reader: Some(reader),
        })
    }

    /// Connection over plain channels, with the other ends standing in for the server.
    pub fn from_channels(
        outgoing: mpsc::UnboundedSender<ClientMessage>,
        incoming: mpsc::UnboundedReceiver<ServerMessage>,
    ) -> Self {
        Self {
            outgoing: Some(outgoing),
            incoming,
            writer: None,
            reader: None,
        }
    }

    pub fn send(&self, msg: ClientMessage) -> Result<(), SyncError> {
        match &self.outgoing {
            Some(outgoing) => outgoing.send(msg).map_err(|_| SyncError::TransportLost),
            None => Err(SyncError::TransportLost),
        }
    }

    /// Next server message, `None` once the connection is gone.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        self.incoming.recv().await
    }

    /// Flush what was sent so far and close the socket.
    pub async fn close(&mut self) {
        self.outgoing.take();
        if let Some(writer) = self.writer.take() {
            let _ = writer.await;
        }
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.incoming.close();
    }
}

impl Drop for LiveConnection {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            writer.abort();
        }
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}
