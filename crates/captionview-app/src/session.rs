//! One caption-player instance: URL input, caption entry, playback and the
//! overlay text that results from them.

use crate::caption::{Caption, CaptionCompositor, CaptionDraft, CaptionStore};
use crate::error::PlayerError;
use crate::playback::backend::BackendFactory;
use crate::playback::types::{BackendKind, PlayerState};
use crate::playback::{PlaybackConfig, PlaybackUpdate, PlayerController};
use crate::settings::Settings;

/// Read-only snapshot for whatever renders the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub url: String,
    pub backend: Option<BackendKind>,
    pub is_playing: bool,
    pub volume: f32,
    pub current_time: f64,
    pub caption: Option<String>,
    pub error: Option<String>,
}

pub struct CaptionSession {
    controller: PlayerController,
    captions: CaptionStore,
    compositor: CaptionCompositor,
    strict_captions: bool,
    pub draft: CaptionDraft,
    url: String,
    /// Rejection reason from the last strict-mode submit.
    caption_error: Option<String>,
}

impl CaptionSession {
    pub fn new(
        factory: Box<dyn BackendFactory>,
        playback: PlaybackConfig,
        compositor: CaptionCompositor,
    ) -> Self {
        Self {
            controller: PlayerController::new(factory, playback),
            captions: CaptionStore::new(),
            compositor,
            strict_captions: false,
            draft: CaptionDraft::default(),
            url: String::new(),
            caption_error: None,
        }
    }

    pub fn from_settings(factory: Box<dyn BackendFactory>, settings: &Settings) -> Self {
        let mut session = Self::new(factory, settings.playback_config(), settings.compositor());
        session.strict_captions = settings.strict_captions;
        session
    }

    pub fn set_strict_captions(&mut self, strict: bool) {
        self.strict_captions = strict;
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> &PlayerState {
        self.controller.state()
    }

    pub fn captions(&self) -> &[Caption] {
        self.captions.captions()
    }

    /// Replace the video URL. The URL is kept even when it is rejected so the
    /// input shows what was typed; the error goes to the error region.
    pub fn set_video_url(&mut self, url: &str) -> Result<(), PlayerError> {
        self.url = url.to_string();
        self.controller.set_url(url)
    }

    /// Submit the pending caption fields. In the default mode invalid input is
    /// ignored; in strict mode the reason is returned and shown.
    pub fn submit_caption(&mut self) -> Result<bool, PlayerError> {
        if self.strict_captions {
            match self.captions.try_submit(&mut self.draft) {
                Ok(()) => {
                    self.caption_error = None;
                    Ok(true)
                }
                Err(e) => {
                    self.caption_error = Some(e.to_string());
                    Err(e)
                }
            }
        } else {
            Ok(self.captions.submit(&mut self.draft))
        }
    }

    /// Fill the draft and submit it in one go.
    pub fn add_caption(&mut self, text: &str, time: &str) -> Result<bool, PlayerError> {
        self.draft.text = text.to_string();
        self.draft.time = time.to_string();
        self.submit_caption()
    }

    pub fn play(&mut self) {
        self.controller.play();
    }

    pub fn pause(&mut self) {
        self.controller.pause();
    }

    pub fn toggle_play_pause(&mut self) {
        self.controller.toggle_play_pause();
    }

    /// Volume input is constrained to 0.0-1.0 here, before it reaches the controller.
    pub fn set_volume(&mut self, volume: f32) {
        let volume = if volume.is_finite() { volume.clamp(0.0, 1.0) } else { 0.0 };
        self.controller.set_volume(volume);
    }

    pub fn seek(&mut self, secs: f64) {
        self.controller.seek(secs);
    }

    /// Apply pending backend signals. Call once per frame.
    pub fn update(&mut self) -> PlaybackUpdate {
        self.controller.update()
    }

    /// Caption text to overlay at the current playback time.
    pub fn overlay_text(&self) -> Option<&str> {
        self.compositor
            .render(self.captions.captions(), self.controller.state().current_time)
    }

    /// Message for the error region: playback errors first, then caption rejections.
    pub fn error_message(&self) -> Option<&str> {
        self.controller
            .state()
            .last_error
            .as_deref()
            .or(self.caption_error.as_deref())
    }

    pub fn view(&self) -> SessionView {
        let state = self.controller.state();
        SessionView {
            url: self.url.clone(),
            backend: self.controller.backend_kind(),
            is_playing: state.is_playing,
            volume: state.volume,
            current_time: state.current_time,
            caption: self.overlay_text().map(str::to_string),
            error: self.error_message().map(str::to_string),
        }
    }
}
