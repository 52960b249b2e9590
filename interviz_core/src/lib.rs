//! interviz Core - Traffic-Scene Client Model
//!
//! Everything the client does between "a text message arrived" and "the
//! scene graph changed":
//! 1. **Protocol**: decoding `map_data` / `frame` messages, encoding `request_frame`
//! 2. **Road network**: ribbon triangulation of way polylines plus flat lane surfaces
//! 3. **Agents**: per-frame reconciliation of the visible agent set
//! 4. **Playback**: the pause / play / scrub state machine and request cadence
//!
//! The renderer itself sits behind the [`SceneGraph`] trait.

pub mod protocol;
pub mod map;
pub mod frame;
pub mod style;
pub mod geometry;
pub mod scene;
pub mod map_builder;
pub mod reconcile;
pub mod playback;

#[cfg(feature = "visualization")]
pub mod visualization;

// Re-export key types for convenience
pub use protocol::{decode_server_message, ClientMessage, ProtocolError, ServerMessage};
pub use map::{MapPayload, Way, WayKind};
pub use frame::{Agent, AgentKind, FramePayload, TrackId};
pub use scene::{Camera, RetainedScene, SceneEnvironment, SceneError, SceneGraph, NodeHandle};
pub use map_builder::{MapMeshBuilder, MapMeshes};
pub use reconcile::{ReconcileStats, VisibleAgentSet};
pub use playback::{Playback, PlaybackMode};
