//! Backend control surfaces and the unified interface the controller drives.
//!
//! The two external players disagree on almost everything: volume scale,
//! whether time is pushed or must be pulled, whether they need a ready
//! handshake, whether commands echo back as events. [`PlayerBackend`] hides
//! those differences behind capability queries so the controller never
//! branches on the backend kind.

use std::sync::Arc;

use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};

use super::types::{BackendEvent, BackendKind};
use crate::error::PlayerError;

/// Channel end a backend uses to report its signals to the controller.
pub type EventSender = Sender<BackendEvent>;

/// Native media element (direct file playback).
///
/// Volume uses the element's 0.0-1.0 scale. Play/pause outcomes and time
/// updates are reported as events, never returned.
pub trait MediaElement: Send {
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn set_volume(&mut self, volume: f64);
    fn seek(&mut self, secs: f64);
}

/// Embedded third-party player.
///
/// Shared with the time poller, so every method takes `&self`. Volume uses the
/// platform's 0-100 scale. There is no time-changed signal: time is read with
/// [`EmbeddedPlayer::current_time`].
pub trait EmbeddedPlayer: Send + Sync {
    fn play_video(&self);
    fn pause_video(&self);
    fn stop_video(&self);
    fn set_volume(&self, volume: u8);
    fn seek_to(&self, secs: f64);
    fn current_time(&self) -> f64;
}

/// Size and autoplay configuration handed to the embedded player at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedConfig {
    #[serde(default = "default_embed_width")]
    pub width: u32,
    #[serde(default = "default_embed_height")]
    pub height: u32,
    #[serde(default = "default_true")]
    pub autoplay: bool,
}

fn default_embed_width() -> u32 {
    640
}

fn default_embed_height() -> u32 {
    390
}

fn default_true() -> bool {
    true
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 390,
            autoplay: true,
        }
    }
}

/// Creates backend handles for a classified source.
pub trait BackendFactory: Send {
    fn open_file(
        &mut self,
        url: &str,
        events: EventSender,
    ) -> Result<Box<dyn MediaElement>, PlayerError>;

    fn open_embedded(
        &mut self,
        media_id: &str,
        config: &EmbedConfig,
        events: EventSender,
    ) -> Result<Arc<dyn EmbeddedPlayer>, PlayerError>;
}

/// Uniform control surface over whichever backend is live.
pub trait PlayerBackend: Send {
    fn kind(&self) -> BackendKind;
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    /// Volume in the internal 0.0-1.0 convention.
    fn set_volume(&mut self, volume: f32);
    fn seek(&mut self, secs: f64);

    /// Commands are ignored until the backend signals `Ready`.
    fn needs_ready(&self) -> bool;
    /// Start playback when `Ready` arrives.
    fn autoplay_on_ready(&self) -> bool;
    /// Play/pause commands are always echoed by a matching event. When false
    /// the controller flips `is_playing` itself.
    fn echoes_transport(&self) -> bool;
    /// A runtime error means playback stopped.
    fn stops_on_error(&self) -> bool;
    /// Handle the poller samples time from, for backends without time events.
    fn time_source(&self) -> Option<Arc<dyn EmbeddedPlayer>>;
}

/// Direct-file adapter: push-model time, events are the truth.
pub struct FileBackend {
    element: Box<dyn MediaElement>,
}

impl FileBackend {
    pub fn new(element: Box<dyn MediaElement>) -> Self {
        Self { element }
    }
}

impl PlayerBackend for FileBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::DirectFile
    }

    fn play(&mut self) {
        self.element.play();
    }

    fn pause(&mut self) {
        self.element.pause();
    }

    fn stop(&mut self) {
        self.element.stop();
    }

    fn set_volume(&mut self, volume: f32) {
        self.element.set_volume(volume as f64);
    }

    fn seek(&mut self, secs: f64) {
        self.element.seek(secs);
    }

    fn needs_ready(&self) -> bool {
        false
    }

    fn autoplay_on_ready(&self) -> bool {
        false
    }

    fn echoes_transport(&self) -> bool {
        true
    }

    fn stops_on_error(&self) -> bool {
        false
    }

    fn time_source(&self) -> Option<Arc<dyn EmbeddedPlayer>> {
        None
    }
}

/// Embedded adapter: ready handshake, autoplay, polled time, 0-100 volume.
pub struct EmbeddedBackend {
    player: Arc<dyn EmbeddedPlayer>,
    autoplay: bool,
}

impl EmbeddedBackend {
    pub fn new(player: Arc<dyn EmbeddedPlayer>, autoplay: bool) -> Self {
        Self { player, autoplay }
    }
}

/// Convert internal 0.0-1.0 volume to the embedded 0-100 scale.
pub fn embedded_volume(volume: f32) -> u8 {
    (volume * 100.0).round().clamp(0.0, 100.0) as u8
}

impl PlayerBackend for EmbeddedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Embedded
    }

    fn play(&mut self) {
        self.player.play_video();
    }

    fn pause(&mut self) {
        self.player.pause_video();
    }

    fn stop(&mut self) {
        self.player.stop_video();
    }

    fn set_volume(&mut self, volume: f32) {
        self.player.set_volume(embedded_volume(volume));
    }

    fn seek(&mut self, secs: f64) {
        self.player.seek_to(secs);
    }

    fn needs_ready(&self) -> bool {
        true
    }

    fn autoplay_on_ready(&self) -> bool {
        self.autoplay
    }

    fn echoes_transport(&self) -> bool {
        false
    }

    fn stops_on_error(&self) -> bool {
        true
    }

    fn time_source(&self) -> Option<Arc<dyn EmbeddedPlayer>> {
        Some(Arc::clone(&self.player))
    }
}
