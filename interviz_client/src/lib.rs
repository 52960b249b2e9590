//! interviz Client
//!
//! The session layer of the traffic-scene viewer: one [`ClientSession`] per
//! connection owns the transport, the scene graph, the visible agent set
//! and the playback state.
//!
//! # Architecture
//!
//! ```text
//!  transport reader task            ClientSession loop (single task)
//!  ┌─────────────────────┐  mpsc   ┌────────────────────────────────────┐
//!  │ transport.recv()    │───────► │ select! {                          │
//!  └─────────────────────┘         │   inbound  -> map / frame / close  │
//!  stdin / UI controls     mpsc    │   commands -> play, scrub, resize  │
//!  ────────────────────────────►   │   ticker   -> present + request    │
//!                                  │ }                                  │
//!                                  └────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use interviz_client::{ClientConfig, ClientSession, ConsoleNotifier};
//!
//! let transport = Arc::new(WsTransport::connect(&config.endpoint).await?);
//! let session = ClientSession::new(config, TokioContext::shared(), transport,
//!     RetainedScene::new(), Box::new(ConsoleNotifier))?;
//! let summary = session.run(commands_rx).await?;
//! ```

mod config;
mod commands;
mod notify;
mod exporter;
mod session;

pub use config::ClientConfig;
pub use commands::{ControlCommand, ParseCommandError};
pub use notify::{ConsoleNotifier, Notifier};
pub use exporter::{RecordedAgent, RecordedFrame, SessionRecording};
pub use session::{ClientSession, SessionError, SessionSummary};
