//! interviz Environment Abstraction Layer
//!
//! This crate isolates everything the scene client needs from the outside
//! world so the session logic can be driven by a real WebSocket in
//! production and by in-memory channels in tests.
//!
//! - Time and task spawning (`VizContext`)
//! - Message-based transport (`MessageTransport`)
//!
//! # Example
//!
//! ```ignore
//! use interviz_env::{MessageTransport, TransportEvent, WsTransport};
//!
//! async fn pump(transport: &WsTransport) {
//!     while let Some(event) = transport.recv().await {
//!         match event {
//!             TransportEvent::Text(text) => handle(text),
//!             TransportEvent::Closed { clean } => break,
//!             TransportEvent::Error(reason) => alert(reason),
//!         }
//!     }
//! }
//! ```

mod context;
mod network;
mod types;
mod error;
mod tokio_impl;
mod websocket;

pub use context::VizContext;
pub use network::{ChannelPeer, ChannelTransport, MessageTransport, TransportEvent};
pub use types::SessionId;
pub use error::EnvError;
pub use tokio_impl::TokioContext;
pub use websocket::WsTransport;
