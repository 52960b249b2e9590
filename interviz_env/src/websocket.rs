//! WebSocket transport backed by tokio-tungstenite.

use crate::error::EnvError;
use crate::network::{MessageTransport, TransportEvent};
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::error::{Error as WsError, ProtocolError};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A client WebSocket connection to a single endpoint.
///
/// Only text frames carry protocol messages; binary, ping and pong
/// frames are skipped by `recv`.
pub struct WsTransport {
    endpoint: String,

    /// Write half (behind tokio mutex for async)
    sink: Mutex<SplitSink<WsStream, Message>>,

    /// Read half
    stream: Mutex<SplitStream<WsStream>>,

    /// Set once a terminal event has been returned from `recv`
    finished: AtomicBool,
}

impl WsTransport {
    /// Opens a connection. No message is sent on connect.
    pub async fn connect(endpoint: &str) -> Result<Self, EnvError> {
        let (socket, response) = connect_async(endpoint)
            .await
            .map_err(|e| EnvError::connect(endpoint, e))?;
        info!(endpoint, status = %response.status(), "connected to scene server");

        let (sink, stream) = socket.split();
        Ok(Self {
            endpoint: endpoint.to_string(),
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
            finished: AtomicBool::new(false),
        })
    }

    /// Returns the endpoint this transport is connected to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn finish(&self, event: TransportEvent) -> Option<TransportEvent> {
        self.finished.store(true, Ordering::SeqCst);
        Some(event)
    }
}

#[async_trait]
impl MessageTransport for WsTransport {
    async fn send_text(&self, text: String) -> Result<(), EnvError> {
        if self.finished.load(Ordering::SeqCst) {
            return Err(EnvError::Closed);
        }
        let mut sink = self.sink.lock().await;
        sink.send(Message::Text(text))
            .await
            .map_err(|e| EnvError::network(e.to_string()))
    }

    async fn close(&self) -> Result<(), EnvError> {
        let mut sink = self.sink.lock().await;
        sink.close().await.map_err(|e| EnvError::network(e.to_string()))
    }

    async fn recv(&self) -> Option<TransportEvent> {
        if self.finished.load(Ordering::SeqCst) {
            return None;
        }
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Some(TransportEvent::Text(text)),
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "server closed the connection");
                    return self.finish(TransportEvent::Closed { clean: true });
                }
                Some(Ok(other)) => {
                    trace!(len = other.len(), "skipping non-text frame");
                }
                Some(Err(e)) if is_dropped_connection(&e) => {
                    debug!(error = %e, "connection dropped without close frame");
                    return self.finish(TransportEvent::Closed { clean: false });
                }
                Some(Err(e)) => return self.finish(TransportEvent::Error(e.to_string())),
                None => return self.finish(TransportEvent::Closed { clean: false }),
            }
        }
    }
}

/// Errors that only mean the peer went away without a closing handshake.
fn is_dropped_connection(error: &WsError) -> bool {
    match error {
        WsError::ConnectionClosed | WsError::AlreadyClosed => true,
        WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => true,
        WsError::Io(e) => matches!(
            e.kind(),
            std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::UnexpectedEof
        ),
        _ => false,
    }
}
