//! Client-server protocol.
//!
//! All messages are JSON text frames carrying an `action` field.
//!
//! ```text
//! client -> server   {"action": "request_frame", "index": 12}
//! server -> client   {"action": "map_data", "payload": MapPayload}
//! server -> client   {"action": "frame",    "payload": FramePayload}
//! ```

use crate::frame::FramePayload;
use crate::map::MapPayload;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─── Server → Client ────────────────────────────────

/// Messages the client understands.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Static road network, pushed once after connect.
    MapData(MapPayload),
    /// Agent state for one requested index.
    Frame(FramePayload),
}

impl ServerMessage {
    /// Serializes the message the way the server sends it.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    action: String,
    #[serde(default)]
    payload: serde_json::Value,
}

/// Decodes one server text message.
///
/// # Returns
/// * `Ok(Some(msg))` - a recognized action with a valid payload
/// * `Ok(None)` - an action this client does not handle
/// * `Err(_)` - not JSON, no `action`, or a payload of the wrong shape
pub fn decode_server_message(text: &str) -> Result<Option<ServerMessage>, ProtocolError> {
    let RawMessage { action, payload } = serde_json::from_str(text)?;

    let decoded = match action.as_str() {
        "map_data" => serde_json::from_value(payload).map(ServerMessage::MapData),
        "frame" => serde_json::from_value(payload).map(ServerMessage::Frame),
        _ => return Ok(None),
    };
    decoded
        .map(Some)
        .map_err(|source| ProtocolError::Payload { action, source })
}

// ─── Client → Server ────────────────────────────────

/// Messages sent from the client to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ask for the frame at `index`. No acknowledgment is tracked.
    RequestFrame { index: u64 },
}

impl ClientMessage {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

/// Errors raised while decoding or encoding protocol messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Not JSON, or no `action` field
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Known action with an unexpected payload shape
    #[error("invalid {action} payload: {source}")]
    Payload {
        action: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Agent;
    use crate::map::{Way, WayKind};

    #[test]
    fn test_request_frame_wire_shape() {
        let text = ClientMessage::RequestFrame { index: 42 }.encode().unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, serde_json::json!({"action": "request_frame", "index": 42}));
    }

    #[test]
    fn test_decode_map_data() {
        let text = r#"{"action":"map_data","payload":{"ways":[{"kind":"Virtual","points":[[1,2]]}],"triangulated_lanes":[]}}"#;
        match decode_server_message(text).unwrap() {
            Some(ServerMessage::MapData(map)) => {
                assert_eq!(map.ways, vec![Way { kind: WayKind::Virtual, points: vec![[1.0, 2.0]] }]);
            }
            other => panic!("expected map data, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_frame() {
        let text = r#"{"action":"frame","payload":{"current_index":3,"max_index":10,"agents":[{"track_id":1,"kind":"CAR","position":[0,0],"extent":[4,2],"color":[255,0,0]}]}}"#;
        let Some(ServerMessage::Frame(frame)) = decode_server_message(text).unwrap() else {
            panic!("expected a frame");
        };
        assert_eq!(frame.current_index, 3);
        assert_eq!(frame.max_index, 10);
        assert_eq!(frame.agents.len(), 1);
    }

    #[test]
    fn test_unknown_action_is_ignored() {
        assert!(decode_server_message(r#"{"action":"hello","payload":{}}"#).unwrap().is_none());
        assert!(decode_server_message(r#"{"action":"request_frame","index":1}"#).unwrap().is_none());
    }

    #[test]
    fn test_malformed_messages() {
        assert!(matches!(decode_server_message("not json"), Err(ProtocolError::Malformed(_))));
        assert!(matches!(decode_server_message(r#"{"payload":{}}"#), Err(ProtocolError::Malformed(_))));
        assert!(matches!(
            decode_server_message(r#"{"action":"frame","payload":{"agents":"none"}}"#),
            Err(ProtocolError::Payload { action, .. }) if action == "frame"
        ));
        assert!(matches!(
            decode_server_message(r#"{"action":"map_data","payload":{"ways":[{"kind":"SolidLine"}]}}"#),
            Err(ProtocolError::Payload { action, .. }) if action == "map_data"
        ));
    }

    #[test]
    fn test_server_encode_is_decodable() {
        let msg = ServerMessage::Frame(FramePayload {
            current_index: 1,
            max_index: 2,
            agents: vec![Agent {
                track_id: 7,
                kind: Default::default(),
                position: [1.0, 2.0],
                yaw: Some(0.5),
                extent: [4.0, 2.0],
                color: None,
            }],
        });
        let text = msg.encode().unwrap();
        assert!(text.starts_with(r#"{"action":"frame","payload":"#));
        assert_eq!(decode_server_message(&text).unwrap(), Some(msg));
    }
}
