//! JSON recording of a viewing session.
//!
//! Captures every frame that was applied to the scene so a session can be
//! inspected or replayed offline.

use interviz_core::{Agent, FramePayload, ReconcileStats};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// One applied frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedFrame {
    /// Session time in seconds
    pub time_sec: f64,

    /// Server frame index
    pub index: u64,

    pub agents: Vec<RecordedAgent>,

    pub created: usize,
    pub updated: usize,
    pub removed: usize,
}

impl RecordedFrame {
    pub fn new(time_sec: f64, frame: &FramePayload, stats: ReconcileStats) -> Self {
        Self {
            time_sec,
            index: frame.current_index,
            agents: frame.agents.iter().map(RecordedAgent::from).collect(),
            created: stats.created,
            updated: stats.updated,
            removed: stats.removed,
        }
    }
}

/// Agent position in map coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedAgent {
    pub track_id: u64,
    pub kind: String,
    pub x: f64,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaw: Option<f64>,
}

impl From<&Agent> for RecordedAgent {
    fn from(agent: &Agent) -> Self {
        Self {
            track_id: agent.track_id,
            kind: agent.kind.to_string(),
            x: agent.position[0],
            y: agent.position[1],
            yaw: agent.yaw,
        }
    }
}

/// Complete session recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecording {
    pub session: String,
    pub endpoint: String,

    /// Time of the last recorded frame
    pub duration_sec: f64,

    /// Ways in the map, 0 if no map arrived
    pub map_ways: usize,

    pub frames: Vec<RecordedFrame>,
}

impl SessionRecording {
    pub fn new(session: &str, endpoint: &str) -> Self {
        Self {
            session: session.to_string(),
            endpoint: endpoint.to_string(),
            duration_sec: 0.0,
            map_ways: 0,
            frames: Vec::new(),
        }
    }

    pub fn add_frame(&mut self, frame: RecordedFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    /// Writes the recording as pretty-printed JSON.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
