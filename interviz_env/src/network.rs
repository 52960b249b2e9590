//! Message transport abstraction for the scene client.

use async_trait::async_trait;
use crate::error::EnvError;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// What the transport hands to its reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A complete text message from the server
    Text(String),

    /// The connection ended. `clean` is false when the peer vanished
    /// without a close handshake.
    Closed { clean: bool },

    /// The transport failed; no further events follow
    Error(String),
}

/// Abstraction for the message-based socket between client and server.
///
/// # Implementations
///
/// - **Production**: `WsTransport` (WebSocket text frames)
/// - **Tests**: `ChannelTransport` (in-memory, driven by a `ChannelPeer`)
///
/// # Message Flow
///
/// ```text
/// Session                   Transport                  Server
///   |                           |                         |
///   |-- send_text(request) ---->|------------------------>|
///   |                           |<----- map_data / frame -|
///   |<-- recv() -> Text --------|                         |
/// ```
#[async_trait]
pub trait MessageTransport: Send + Sync + 'static {
    /// Sends one text message.
    ///
    /// # Returns
    /// * `Ok(())` - Message handed to the socket
    /// * `Err(EnvError)` - The socket is closed or broken
    ///
    /// # Note
    /// Success does not mean the server answered; requests are fire-and-forget.
    async fn send_text(&self, text: String) -> Result<(), EnvError>;

    /// Receives the next transport event.
    ///
    /// # Returns
    /// * `Some(event)` - A message, a close, or an error
    /// * `None` - The transport was already drained
    async fn recv(&self) -> Option<TransportEvent>;

    /// Starts an orderly shutdown of the connection.
    async fn close(&self) -> Result<(), EnvError>;
}

/// In-memory transport, the client half of a channel pair.
pub struct ChannelTransport {
    /// Messages sent by the client, read by the peer
    tx: mpsc::Sender<String>,

    /// Events produced by the peer (behind tokio mutex for async)
    rx: Arc<Mutex<mpsc::Receiver<TransportEvent>>>,
}

/// The server half of a `ChannelTransport` pair.
pub struct ChannelPeer {
    tx: mpsc::Sender<TransportEvent>,
    rx: mpsc::Receiver<String>,
}

impl ChannelTransport {
    /// Creates a connected client/peer pair with the given buffer size.
    pub fn pair(capacity: usize) -> (Self, ChannelPeer) {
        let (client_tx, peer_rx) = mpsc::channel(capacity);
        let (peer_tx, client_rx) = mpsc::channel(capacity);
        let transport = Self {
            tx: client_tx,
            rx: Arc::new(Mutex::new(client_rx)),
        };
        let peer = ChannelPeer {
            tx: peer_tx,
            rx: peer_rx,
        };
        (transport, peer)
    }
}

#[async_trait]
impl MessageTransport for ChannelTransport {
    async fn send_text(&self, text: String) -> Result<(), EnvError> {
        self.tx.send(text).await.map_err(|_| EnvError::Closed)
    }

    async fn recv(&self) -> Option<TransportEvent> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }

    async fn close(&self) -> Result<(), EnvError> {
        // Nothing to flush; the peer sees the channel end once this is dropped
        Ok(())
    }
}

impl ChannelPeer {
    /// Pushes a text message to the client.
    pub async fn send_text(&self, text: impl Into<String>) -> Result<(), EnvError> {
        self.push(TransportEvent::Text(text.into())).await
    }

    /// Closes the connection, cleanly or not.
    pub async fn close(&self, clean: bool) -> Result<(), EnvError> {
        self.push(TransportEvent::Closed { clean }).await
    }

    /// Reports a transport failure to the client.
    pub async fn fail(&self, reason: impl Into<String>) -> Result<(), EnvError> {
        self.push(TransportEvent::Error(reason.into())).await
    }

    /// Waits for the next message the client sent.
    pub async fn recv_text(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Returns a message the client already sent, if any.
    pub fn try_recv_text(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    async fn push(&self, event: TransportEvent) -> Result<(), EnvError> {
        self.tx.send(event).await.map_err(|_| EnvError::Closed)
    }
}
