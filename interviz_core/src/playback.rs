//! Playback state machine and frame-request cadence.
//!
//! ```text
//!            toggle                     scrub_begin
//!   Paused <--------> Playing    any ---------------> Paused (remembers prior)
//!                                 Paused --scrub_end(i)--> prior, current_index = i
//! ```
//!
//! While playing, every `cadence`-th tick yields the index to request and
//! advances it. While paused no requests are issued and incoming frames are
//! dropped so scrubbing does not make agents jump.
//!
//! Past the last known index playback stays in `Playing` but stops asking,
//! so replies still in flight are applied. It pauses once the frame at the
//! last index has been applied.

use crate::frame::FramePayload;
use tracing::debug;

/// Ticks between two frame requests.
pub const DEFAULT_REQUEST_CADENCE: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    Paused,
    Playing,
}

impl PlaybackMode {
    fn flipped(self) -> Self {
        match self {
            Self::Paused => Self::Playing,
            Self::Playing => Self::Paused,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Playback {
    mode: PlaybackMode,
    /// Next index to request
    current_index: u64,
    /// Position of the scrub handle while dragging
    pending_index: Option<u64>,
    /// Mode to restore when the current scrub ends
    resume_after_scrub: Option<PlaybackMode>,
    cadence: u32,
    tick_counter: u64,
    /// Last index the server has, 0 while unknown
    max_index: u64,
}

impl Default for Playback {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_CADENCE, 0)
    }
}

impl Playback {
    /// Creates a paused playback starting at `start_index`.
    pub fn new(cadence: u32, start_index: u64) -> Self {
        Self {
            mode: PlaybackMode::Paused,
            current_index: start_index,
            pending_index: None,
            resume_after_scrub: None,
            cadence: cadence.max(1),
            tick_counter: 0,
            max_index: 0,
        }
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn is_paused(&self) -> bool {
        self.mode == PlaybackMode::Paused
    }

    pub fn is_scrubbing(&self) -> bool {
        self.resume_after_scrub.is_some()
    }

    pub fn current_index(&self) -> u64 {
        self.current_index
    }

    pub fn pending_index(&self) -> Option<u64> {
        self.pending_index
    }

    pub fn max_index(&self) -> u64 {
        self.max_index
    }

    pub fn cadence(&self) -> u32 {
        self.cadence
    }

    /// Flips between paused and playing.
    ///
    /// During a scrub the flip applies to the mode restored at scrub end.
    pub fn toggle(&mut self) {
        match self.resume_after_scrub.as_mut() {
            Some(resume) => *resume = resume.flipped(),
            None => self.mode = self.mode.flipped(),
        }
        debug!(mode = ?self.mode, "playback toggled");
    }

    /// Starts playing; during a scrub, playback resumes at scrub end.
    pub fn play(&mut self) {
        self.set_mode(PlaybackMode::Playing);
    }

    /// Pauses; during a scrub, playback stays paused at scrub end.
    pub fn pause(&mut self) {
        self.set_mode(PlaybackMode::Paused);
    }

    fn set_mode(&mut self, mode: PlaybackMode) {
        match self.resume_after_scrub.as_mut() {
            Some(resume) => *resume = mode,
            None => self.mode = mode,
        }
    }

    /// Jumps to an index without changing the mode.
    pub fn seek(&mut self, index: u64) {
        self.current_index = index;
    }

    /// The user grabbed the position control.
    pub fn scrub_begin(&mut self) {
        if self.resume_after_scrub.is_none() {
            self.resume_after_scrub = Some(self.mode);
        }
        self.mode = PlaybackMode::Paused;
    }

    /// The position control moved.
    pub fn scrub_move(&mut self, index: u64) {
        self.pending_index = Some(index);
    }

    /// The user released the position control at `index`.
    pub fn scrub_end(&mut self, index: u64) {
        if let Some(resume) = self.resume_after_scrub.take() {
            self.mode = resume;
        }
        self.pending_index = None;
        self.current_index = index;
        debug!(index, mode = ?self.mode, "scrub finished");
    }

    /// Whether incoming frames should be applied to the scene.
    pub fn accepts_frames(&self) -> bool {
        !self.is_paused()
    }

    /// Learns the timeline length from a frame.
    pub fn observe_frame(&mut self, frame: &FramePayload) {
        if frame.max_index > 0 {
            self.max_index = frame.max_index;
        }
    }

    /// Whether every index up to the last known one has been requested.
    pub fn is_at_end(&self) -> bool {
        self.max_index > 0 && self.current_index > self.max_index
    }

    /// Called after `frame` reached the scene; pauses on the last frame.
    pub fn frame_applied(&mut self, frame: &FramePayload) {
        if self.max_index > 0 && frame.current_index >= self.max_index && !self.is_paused() {
            debug!(max_index = self.max_index, "end of timeline, pausing");
            self.mode = PlaybackMode::Paused;
        }
    }

    /// Advances one animation tick.
    ///
    /// # Returns
    /// The frame index to request, on every `cadence`-th tick while playing.
    pub fn on_tick(&mut self) -> Option<u64> {
        if self.is_paused() {
            return None;
        }
        if self.is_at_end() {
            return None;
        }

        let due = self.tick_counter % self.cadence as u64 == 0;
        self.tick_counter += 1;
        if !due {
            return None;
        }

        let index = self.current_index;
        self.current_index += 1;
        Some(index)
    }
}
