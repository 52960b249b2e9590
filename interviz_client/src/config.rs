//! Client configuration.

use interviz_core::playback::DEFAULT_REQUEST_CADENCE;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for one client session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket endpoint of the scene server
    pub endpoint: String,

    /// Display ticks per second (render + cadence check)
    pub tick_rate_hz: u32,

    /// Ticks between two frame requests while playing
    pub request_cadence: u32,

    /// First frame index to request
    pub start_index: u64,

    /// Start in the playing state instead of paused
    pub start_playing: bool,

    /// Initial viewport size
    pub viewport: (u32, u32),

    /// Where to write a JSON recording of applied frames
    pub record_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://localhost:8765".to_string(),
            tick_rate_hz: 60,
            request_cadence: DEFAULT_REQUEST_CADENCE,
            start_index: 0,
            start_playing: false,
            viewport: (1280, 720),
            record_path: None,
        }
    }
}

impl ClientConfig {
    /// Time between two display ticks.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz.max(1) as f64)
    }
}
