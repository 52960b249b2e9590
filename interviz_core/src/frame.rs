//! Per-frame agent state.

use crate::map::Point2;
use crate::style::{palette_color, Rgb};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Stable per-agent identifier, the reconciliation key between frames.
pub type TrackId = u64;

/// Class of a tracked agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AgentKind {
    #[default]
    Car,
    Truck,
    Pedestrian,
    Bicycle,
    Motorcycle,
    Unrecognized(String),
}

impl AgentKind {
    pub fn name(&self) -> &str {
        match self {
            Self::Car => "CAR",
            Self::Truck => "TRUCK",
            Self::Pedestrian => "PEDESTRIAN",
            Self::Bicycle => "BICYCLE",
            Self::Motorcycle => "MOTORCYCLE",
            Self::Unrecognized(name) => name,
        }
    }
}

impl From<String> for AgentKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "CAR" => Self::Car,
            "TRUCK" => Self::Truck,
            "PEDESTRIAN" => Self::Pedestrian,
            "BICYCLE" => Self::Bicycle,
            "MOTORCYCLE" => Self::Motorcycle,
            _ => Self::Unrecognized(name),
        }
    }
}

impl From<AgentKind> for String {
    fn from(kind: AgentKind) -> Self {
        match kind {
            AgentKind::Unrecognized(name) => name,
            other => other.name().to_string(),
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A tracked dynamic object in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub track_id: TrackId,

    #[serde(default)]
    pub kind: AgentKind,

    /// Map position `[x, y]`
    pub position: Point2,

    /// Heading in radians, when the tracker has one
    #[serde(default)]
    pub yaw: Option<f64>,

    /// `[length, width]` in meters
    #[serde(default)]
    pub extent: [f64; 2],

    #[serde(default)]
    pub color: Option<Rgb>,
}

impl Agent {
    /// The server-assigned color, or the track's palette color.
    pub fn color(&self) -> Rgb {
        self.color.unwrap_or_else(|| palette_color(self.track_id))
    }
}

/// One step of the recorded scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FramePayload {
    #[serde(default)]
    pub current_index: u64,

    /// Last valid frame index; 0 when the server does not say
    #[serde(default)]
    pub max_index: u64,

    #[serde(default)]
    pub agents: Vec<Agent>,
}

impl FramePayload {
    /// Set of track ids present in this frame.
    pub fn track_ids(&self) -> HashSet<TrackId> {
        self.agents.iter().map(|a| a.track_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_decodes_with_defaults() {
        let agent: Agent = serde_json::from_str(
            r#"{"track_id":1,"position":[0.5,-2.0],"extent":[4,2],"color":[255,0,0]}"#,
        )
        .unwrap();

        assert_eq!(agent.kind, AgentKind::Car);
        assert_eq!(agent.yaw, None);
        assert_eq!(agent.color(), Rgb(255, 0, 0));
    }

    #[test]
    fn test_agent_kind_names() {
        let agent: Agent = serde_json::from_str(
            r#"{"track_id":9,"kind":"PEDESTRIAN","position":[0,0],"yaw":1.5}"#,
        )
        .unwrap();
        assert_eq!(agent.kind, AgentKind::Pedestrian);
        assert_eq!(agent.yaw, Some(1.5));
        assert_eq!(agent.color(), palette_color(9));

        let kind: AgentKind = serde_json::from_str("\"TRAM\"").unwrap();
        assert_eq!(kind, AgentKind::Unrecognized("TRAM".into()));
    }

    #[test]
    fn test_frame_track_ids() {
        let frame: FramePayload = serde_json::from_str(
            r#"{"agents":[{"track_id":3,"position":[0,0]},{"track_id":5,"position":[1,1]}]}"#,
        )
        .unwrap();

        assert_eq!(frame.current_index, 0);
        assert_eq!(frame.max_index, 0);
        assert_eq!(frame.track_ids(), HashSet::from([3, 5]));
    }
}
