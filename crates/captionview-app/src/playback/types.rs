use std::fmt;

use serde::{Deserialize, Serialize};

/// Which kind of backend a source is played through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// Natively rendered media element playing a direct resource URL.
    DirectFile,
    /// Third-party hosted player reached through a media identifier.
    Embedded,
}

impl BackendKind {
    /// User-visible message for a runtime failure reported by this backend.
    pub fn error_message(&self) -> &'static str {
        match self {
            BackendKind::DirectFile => "An error occurred while playing the video file.",
            BackendKind::Embedded => "An error occurred while playing the YouTube video.",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            BackendKind::DirectFile => "file",
            BackendKind::Embedded => "embedded",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Player state reported by the embedded platform's state-change signal.
/// Discriminants are the platform's numeric state codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum EmbeddedState {
    Unstarted = -1,
    Ended = 0,
    Playing = 1,
    Paused = 2,
    Buffering = 3,
    Cued = 5,
}

/// Signal emitted by a backend. Delivered over the attachment's channel and
/// applied to [`PlayerState`] on the controller's thread.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    /// Backend can accept commands.
    Ready,
    Play,
    Pause,
    /// Runtime failure with a backend-side detail string.
    Error(String),
    /// Embedded state-change signal.
    StateChange(EmbeddedState),
    /// One clock tick: pushed by the file backend or pulled by the poller.
    TimeUpdate(f64),
}

/// Playback state owned by the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub is_playing: bool,
    /// Internal volume convention, 0.0-1.0.
    pub volume: f32,
    /// Seconds, never negative.
    pub current_time: f64,
    pub last_error: Option<String>,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            is_playing: false,
            volume: 1.0,
            current_time: 0.0,
            last_error: None,
        }
    }
}

impl PlayerState {
    pub fn with_volume(volume: f32) -> Self {
        Self {
            volume,
            ..Self::default()
        }
    }

    /// Reset for a newly selected source. Volume is a user preference and survives.
    pub fn reset_for_source(&mut self) {
        self.is_playing = false;
        self.current_time = 0.0;
        self.last_error = None;
    }

    /// Record a clock tick. Non-finite samples are dropped, negatives clamp to 0.
    pub fn apply_time(&mut self, secs: f64) -> bool {
        if !secs.is_finite() {
            return false;
        }
        let secs = secs.max(0.0);
        if secs == self.current_time {
            return false;
        }
        self.current_time = secs;
        true
    }
}
