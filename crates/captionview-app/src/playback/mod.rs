pub mod backend;
pub mod clock;
pub mod headless;
pub mod probe;
pub mod source;
#[cfg(test)]
pub(crate) mod testing;
pub mod types;

use std::time::Duration;

use crossbeam_channel::Receiver;

use self::backend::{BackendFactory, EmbedConfig, EmbeddedBackend, FileBackend, PlayerBackend};
use self::clock::{DEFAULT_POLL_INTERVAL, PollStopped, TimePoller};
use self::source::PlaybackSource;
use self::types::{BackendEvent, BackendKind, EmbeddedState, PlayerState};
use crate::error::PlayerError;

/// Controller construction parameters.
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    pub poll_interval: Duration,
    pub embed: EmbedConfig,
    pub initial_volume: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            embed: EmbedConfig::default(),
            initial_volume: 1.0,
        }
    }
}

/// Result of a single `PlayerController::update()` call.
#[derive(Debug, Default)]
pub struct PlaybackUpdate {
    pub events: usize,
    pub time_changed: bool,
    pub errors: Vec<PlayerError>,
}

/// One live backend plus everything bound to its lifetime.
struct Attachment {
    backend: Box<dyn PlayerBackend>,
    events: Receiver<BackendEvent>,
    /// Kept so the poller can be handed a sender after `Ready`.
    event_tx: crossbeam_channel::Sender<BackendEvent>,
    poller: Option<TimePoller>,
    ready: bool,
}

/// Proof that the previous attachment is fully gone (poll joined, handle stopped).
struct Detached(());

impl Attachment {
    /// Tear down in order: stop sampling, stop the handle, drop it.
    fn release(mut self) -> (Detached, Option<PollStopped>) {
        let stopped = self.poller.take().map(TimePoller::cancel);
        self.backend.stop();
        log::info!("Detached {} backend", self.backend.kind());
        (Detached(()), stopped)
    }
}

/// Unified play/pause/volume surface over whichever backend is live, keeping
/// [`PlayerState`] in line with what the backend reports.
///
/// Direct files and embedded players are deliberately not symmetric:
/// - a direct file starts paused and its own play/pause events are the only
///   writer of `is_playing`;
/// - an embedded player autoplays once it signals ready, and its play/pause
///   commands also flip `is_playing` locally because it does not promise a
///   matching event for every command. Later events still override.
pub struct PlayerController {
    factory: Box<dyn BackendFactory>,
    config: PlaybackConfig,
    state: PlayerState,
    source: PlaybackSource,
    attachment: Option<Attachment>,
}

impl PlayerController {
    pub fn new(factory: Box<dyn BackendFactory>, config: PlaybackConfig) -> Self {
        let state = PlayerState::with_volume(config.initial_volume);
        Self {
            factory,
            config,
            state,
            source: PlaybackSource::Unset,
            attachment: None,
        }
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn source(&self) -> &PlaybackSource {
        &self.source
    }

    /// Kind of the attached backend, if any.
    pub fn backend_kind(&self) -> Option<BackendKind> {
        self.attachment.as_ref().map(|a| a.backend.kind())
    }

    pub fn is_ready(&self) -> bool {
        self.attachment.as_ref().is_some_and(|a| a.ready)
    }

    pub fn is_polling(&self) -> bool {
        self.attachment
            .as_ref()
            .and_then(|a| a.poller.as_ref())
            .is_some_and(TimePoller::is_running)
    }

    /// Select a new source from a raw URL. The previous backend is always
    /// released first; on error nothing new is attached and the error is also
    /// recorded as `last_error`.
    pub fn set_url(&mut self, raw: &str) -> Result<(), PlayerError> {
        let detached = self.detach();
        self.state.reset_for_source();

        let source = match source::classify(raw) {
            Ok(source) => source,
            Err(e) => {
                log::warn!("{e}");
                self.source = PlaybackSource::Unset;
                self.state.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        if let Err(e) = self.attach(source.clone(), detached) {
            log::warn!("{e}");
            self.source = PlaybackSource::Unset;
            self.state.last_error = Some(e.to_string());
            return Err(e);
        }
        self.source = source;
        Ok(())
    }

    fn attach(&mut self, source: PlaybackSource, _detached: Detached) -> Result<(), PlayerError> {
        let (event_tx, events) = crossbeam_channel::unbounded();

        let mut backend: Box<dyn PlayerBackend> = match &source {
            PlaybackSource::Unset => return Ok(()),
            PlaybackSource::DirectFile { url } => {
                let element = self.factory.open_file(url, event_tx.clone())?;
                Box::new(FileBackend::new(element))
            }
            PlaybackSource::Embedded { media_id } => {
                let player = self.factory.open_embedded(
                    media_id,
                    &self.config.embed,
                    event_tx.clone(),
                )?;
                Box::new(EmbeddedBackend::new(player, self.config.embed.autoplay))
            }
        };

        let ready = !backend.needs_ready();
        if ready {
            backend.set_volume(self.state.volume);
        }

        log::info!("Attached {} backend for {:?}", backend.kind(), source);

        self.attachment = Some(Attachment {
            backend,
            events,
            event_tx,
            poller: None,
            ready,
        });
        Ok(())
    }

    /// Release the live backend, if any, and stop its time poll.
    fn detach(&mut self) -> Detached {
        match self.attachment.take() {
            Some(attachment) => {
                let (detached, stopped) = attachment.release();
                if let Some(stopped) = stopped {
                    log::debug!("Time poll joined after {} samples", stopped.samples);
                }
                detached
            }
            None => Detached(()),
        }
    }

    /// Clear the source and release the backend.
    pub fn clear(&mut self) {
        self.detach();
        self.source = PlaybackSource::Unset;
        self.state.reset_for_source();
    }

    pub fn play(&mut self) {
        self.transport(true);
    }

    pub fn pause(&mut self) {
        self.transport(false);
    }

    pub fn toggle_play_pause(&mut self) {
        self.transport(!self.state.is_playing);
    }

    fn transport(&mut self, play: bool) {
        let Some(attachment) = self.attachment.as_mut() else {
            return;
        };
        if !attachment.ready {
            log::debug!("Ignoring {} before backend is ready", if play { "play" } else { "pause" });
            return;
        }
        if play {
            attachment.backend.play();
        } else {
            attachment.backend.pause();
        }
        if !attachment.backend.echoes_transport() {
            self.state.is_playing = play;
        }
    }

    /// Set volume in the 0.0-1.0 convention. Range is the caller's job. Before
    /// the backend is ready the value is only remembered.
    pub fn set_volume(&mut self, volume: f32) {
        self.state.volume = volume;
        if let Some(attachment) = self.attachment.as_mut() {
            if attachment.ready {
                attachment.backend.set_volume(volume);
            }
        }
    }

    /// Seek the live backend. The next clock tick supersedes the local value.
    pub fn seek(&mut self, secs: f64) {
        if !secs.is_finite() {
            return;
        }
        let secs = secs.max(0.0);
        let Some(attachment) = self.attachment.as_mut() else {
            return;
        };
        if !attachment.ready {
            return;
        }
        attachment.backend.seek(secs);
        self.state.apply_time(secs);
    }

    /// Drain backend signals and apply them. Call once per frame.
    pub fn update(&mut self) -> PlaybackUpdate {
        let mut result = PlaybackUpdate::default();
        let Some(attachment) = self.attachment.as_mut() else {
            return result;
        };

        let events: Vec<BackendEvent> = attachment.events.try_iter().collect();
        result.events = events.len();
        let poll_interval = self.config.poll_interval;

        for event in events {
            match event {
                BackendEvent::Ready => {
                    if attachment.ready {
                        continue;
                    }
                    attachment.ready = true;
                    attachment.backend.set_volume(self.state.volume);
                    if attachment.backend.autoplay_on_ready() {
                        attachment.backend.play();
                        self.state.is_playing = true;
                    }
                    if let Some(player) = attachment.backend.time_source() {
                        match TimePoller::spawn(player, poll_interval, attachment.event_tx.clone()) {
                            Ok(poller) => attachment.poller = Some(poller),
                            Err(e) => log::error!("Failed to start time poll: {e}"),
                        }
                    }
                    log::info!("{} backend ready", attachment.backend.kind());
                }
                BackendEvent::Play => self.state.is_playing = true,
                BackendEvent::Pause => self.state.is_playing = false,
                BackendEvent::StateChange(state) => {
                    self.state.is_playing = state == EmbeddedState::Playing;
                }
                BackendEvent::TimeUpdate(secs) => {
                    if self.state.apply_time(secs) {
                        result.time_changed = true;
                    }
                }
                BackendEvent::Error(detail) => {
                    let err = PlayerError::BackendPlayback {
                        backend: attachment.backend.kind(),
                        detail,
                    };
                    log::warn!("{err} ({})", err.detail().unwrap_or_default());
                    self.state.last_error = Some(err.to_string());
                    if attachment.backend.stops_on_error() {
                        self.state.is_playing = false;
                    }
                    result.errors.push(err);
                }
            }
        }

        result
    }
}

impl Drop for PlayerController {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::testing::{Call, FakeFactory};

    fn controller() -> (PlayerController, FakeFactory) {
        let factory = FakeFactory::new();
        let config = PlaybackConfig {
            poll_interval: Duration::from_millis(2),
            ..PlaybackConfig::default()
        };
        (PlayerController::new(Box::new(factory.clone()), config), factory)
    }

    fn wait_for_time(c: &mut PlayerController, secs: f64) {
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while std::time::Instant::now() < deadline {
            c.update();
            if (c.state().current_time - secs).abs() < 1e-9 {
                return;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        panic!("clock never reached {secs}");
    }

    #[test]
    fn embedded_autoplays_on_ready_with_scaled_volume() {
        let (mut c, factory) = controller();
        c.set_url("https://www.youtube.com/watch?v=abc123").unwrap();
        let opened = factory.last_embedded();
        assert_eq!(opened.media_id, "abc123");
        assert!(!c.state().is_playing);
        assert!(opened.player.calls().take().is_empty());

        opened.events.send(BackendEvent::Ready).unwrap();
        c.update();
        assert!(c.state().is_playing);
        assert!(c.is_ready());
        assert_eq!(
            opened.player.calls().take(),
            vec![Call::SetVolume(100.0), Call::Play]
        );
    }

    #[test]
    fn embed_config_reaches_player_and_autoplay_can_be_disabled() {
        let factory = FakeFactory::new();
        let embed = EmbedConfig {
            width: 1280,
            height: 720,
            autoplay: false,
        };
        let config = PlaybackConfig {
            embed: embed.clone(),
            ..PlaybackConfig::default()
        };
        let mut c = PlayerController::new(Box::new(factory.clone()), config);
        c.set_url("https://youtu.be/xyz").unwrap();
        let opened = factory.last_embedded();
        assert_eq!(opened.config, embed);

        opened.events.send(BackendEvent::Ready).unwrap();
        c.update();
        assert!(!c.state().is_playing);
        assert_eq!(opened.player.calls().take(), vec![Call::SetVolume(100.0)]);
    }

    #[test]
    fn embedded_volume_is_percent() {
        let (mut c, factory) = controller();
        c.set_url("https://youtu.be/xyz").unwrap();
        let opened = factory.last_embedded();
        opened.events.send(BackendEvent::Ready).unwrap();
        c.update();
        opened.player.calls().take();

        c.set_volume(0.5);
        assert_eq!(opened.player.calls().take(), vec![Call::SetVolume(50.0)]);
    }

    #[test]
    fn file_volume_applied_on_attach_and_passed_through() {
        let (mut c, factory) = controller();
        c.set_volume(0.8);
        c.set_url("https://cdn.example.com/a.mp4").unwrap();
        let opened = factory.last_file();
        assert_eq!(opened.url, "https://cdn.example.com/a.mp4");
        assert_eq!(opened.calls.take(), vec![Call::SetVolume(0.8f32 as f64)]);

        c.set_volume(0.5);
        assert_eq!(opened.calls.take(), vec![Call::SetVolume(0.5)]);
    }

    #[test]
    fn file_play_waits_for_backend_event() {
        let (mut c, factory) = controller();
        c.set_url("/videos/a.mp4").unwrap();
        let opened = factory.last_file();
        opened.calls.take();

        c.play();
        assert_eq!(opened.calls.take(), vec![Call::Play]);
        assert!(!c.state().is_playing);

        opened.events.send(BackendEvent::Play).unwrap();
        c.update();
        assert!(c.state().is_playing);

        opened.events.send(BackendEvent::Pause).unwrap();
        c.update();
        assert!(!c.state().is_playing);
    }

    #[test]
    fn file_does_not_autoplay() {
        let (mut c, factory) = controller();
        c.set_url("/videos/a.mp4").unwrap();
        let opened = factory.last_file();
        opened.events.send(BackendEvent::Ready).unwrap();
        c.update();
        assert!(!c.state().is_playing);
        assert!(!opened.calls.take().contains(&Call::Play));
    }

    #[test]
    fn embedded_pause_flips_locally_and_events_override() {
        let (mut c, factory) = controller();
        c.set_url("https://youtu.be/xyz").unwrap();
        let opened = factory.last_embedded();
        opened.events.send(BackendEvent::Ready).unwrap();
        c.update();
        opened.player.calls().take();

        c.pause();
        assert!(!c.state().is_playing);
        assert_eq!(opened.player.calls().take(), vec![Call::Pause]);

        // The backend is the source of truth.
        opened
            .events
            .send(BackendEvent::StateChange(EmbeddedState::Playing))
            .unwrap();
        c.update();
        assert!(c.state().is_playing);

        opened
            .events
            .send(BackendEvent::StateChange(EmbeddedState::Buffering))
            .unwrap();
        c.update();
        assert!(!c.state().is_playing);
    }

    #[test]
    fn toggle_uses_current_state() {
        let (mut c, factory) = controller();
        c.set_url("https://youtu.be/xyz").unwrap();
        let opened = factory.last_embedded();
        opened.events.send(BackendEvent::Ready).unwrap();
        c.update();
        opened.player.calls().take();

        c.toggle_play_pause();
        assert!(!c.state().is_playing);
        c.toggle_play_pause();
        assert!(c.state().is_playing);
        assert_eq!(opened.player.calls().take(), vec![Call::Pause, Call::Play]);
    }

    #[test]
    fn commands_before_ready_are_held() {
        let (mut c, factory) = controller();
        c.set_url("https://youtu.be/xyz").unwrap();
        let opened = factory.last_embedded();

        c.play();
        c.set_volume(0.25);
        c.seek(10.0);
        assert!(opened.player.calls().take().is_empty());
        assert!(!c.state().is_playing);

        opened.events.send(BackendEvent::Ready).unwrap();
        c.update();
        assert_eq!(
            opened.player.calls().take(),
            vec![Call::SetVolume(25.0), Call::Play]
        );
    }

    #[test]
    fn embedded_error_stops_playback() {
        let (mut c, factory) = controller();
        c.set_url("https://youtu.be/xyz").unwrap();
        let opened = factory.last_embedded();
        opened.events.send(BackendEvent::Ready).unwrap();
        opened.events.send(BackendEvent::Error("150".into())).unwrap();
        let update = c.update();

        assert!(!c.state().is_playing);
        assert_eq!(update.errors.len(), 1);
        assert_eq!(
            c.state().last_error.as_deref(),
            Some("An error occurred while playing the YouTube video.")
        );
        // Source is kept.
        assert_eq!(c.backend_kind(), Some(BackendKind::Embedded));
    }

    #[test]
    fn file_error_keeps_playing_state() {
        let (mut c, factory) = controller();
        c.set_url("/videos/a.mp4").unwrap();
        let opened = factory.last_file();
        opened.events.send(BackendEvent::Play).unwrap();
        opened.events.send(BackendEvent::Error("decode".into())).unwrap();
        c.update();

        assert!(c.state().is_playing);
        assert_eq!(
            c.state().last_error.as_deref(),
            Some(BackendKind::DirectFile.error_message())
        );
    }

    #[test]
    fn file_time_is_pushed() {
        let (mut c, factory) = controller();
        c.set_url("/videos/a.mp4").unwrap();
        let opened = factory.last_file();
        opened.events.send(BackendEvent::TimeUpdate(1.5)).unwrap();
        opened.events.send(BackendEvent::TimeUpdate(1.75)).unwrap();
        let update = c.update();
        assert!(update.time_changed);
        assert!((c.state().current_time - 1.75).abs() < 1e-10);
        assert!(!c.is_polling());
    }

    #[test]
    fn embedded_time_is_polled_after_ready() {
        let (mut c, factory) = controller();
        c.set_url("https://youtu.be/xyz").unwrap();
        let opened = factory.last_embedded();
        opened.player.set_time(7.5);
        assert!(!c.is_polling());

        opened.events.send(BackendEvent::Ready).unwrap();
        c.update();
        assert!(c.is_polling());
        wait_for_time(&mut c, 7.5);
    }

    #[test]
    fn url_change_stops_embedded_poll_before_release() {
        let (mut c, factory) = controller();
        c.set_url("https://youtu.be/xyz").unwrap();
        let opened = factory.last_embedded();
        opened.player.set_time(3.0);
        opened.events.send(BackendEvent::Ready).unwrap();
        c.update();
        wait_for_time(&mut c, 3.0);

        c.set_url("/videos/next.mp4").unwrap();
        assert!(opened.player.calls().take().contains(&Call::Stop));
        let reads = opened.player.reads();

        opened.player.set_time(99.0);
        for _ in 0..10 {
            std::thread::sleep(Duration::from_millis(3));
            c.update();
        }
        assert_eq!(opened.player.stale_reads(), 0);
        assert_eq!(opened.player.reads(), reads);
        assert!((c.state().current_time - 0.0).abs() < 1e-10);
        assert_eq!(c.backend_kind(), Some(BackendKind::DirectFile));
    }

    #[test]
    fn clearing_url_stops_poll() {
        let (mut c, factory) = controller();
        c.set_url("https://youtu.be/xyz").unwrap();
        let opened = factory.last_embedded();
        opened.events.send(BackendEvent::Ready).unwrap();
        c.update();

        c.set_url("").unwrap();
        let reads = opened.player.reads();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(opened.player.reads(), reads);
        assert_eq!(opened.player.stale_reads(), 0);
        assert!(c.source().is_unset());
        assert!(c.backend_kind().is_none());
    }

    #[test]
    fn events_from_released_backend_are_ignored() {
        let (mut c, factory) = controller();
        c.set_url("/videos/a.mp4").unwrap();
        let old = factory.last_file();
        c.set_url("/videos/b.mp4").unwrap();

        assert!(old.events.send(BackendEvent::Play).is_err());
        c.update();
        assert!(!c.state().is_playing);
    }

    #[test]
    fn url_change_resets_state() {
        let (mut c, factory) = controller();
        c.set_volume(0.4);
        c.set_url("/videos/a.mp4").unwrap();
        let opened = factory.last_file();
        opened.events.send(BackendEvent::Play).unwrap();
        opened.events.send(BackendEvent::TimeUpdate(12.0)).unwrap();
        opened.events.send(BackendEvent::Error("x".into())).unwrap();
        c.update();

        c.set_url("/videos/b.mp4").unwrap();
        assert!(!c.state().is_playing);
        assert!(c.state().last_error.is_none());
        assert!((c.state().current_time - 0.0).abs() < 1e-10);
        assert!((c.state().volume - 0.4).abs() < 1e-6);
    }

    #[test]
    fn invalid_url_detaches_and_records_error() {
        let (mut c, factory) = controller();
        c.set_url("https://youtu.be/xyz").unwrap();
        let opened = factory.last_embedded();
        opened.events.send(BackendEvent::Ready).unwrap();
        c.update();

        let err = c.set_url("https://www.youtube.com/watch?list=abc").unwrap_err();
        assert!(matches!(err, PlayerError::InvalidVideoUrl(_)));
        assert!(opened.player.calls().take().contains(&Call::Stop));
        assert!(c.backend_kind().is_none());
        assert!(c.source().is_unset());
        assert_eq!(c.state().last_error, Some(err.to_string()));
    }

    #[test]
    fn factory_failure_leaves_nothing_attached() {
        let (mut c, factory) = controller();
        factory.fail_next("no network");
        let err = c.set_url("https://youtu.be/xyz").unwrap_err();
        assert!(matches!(err, PlayerError::BackendUnavailable { .. }));
        assert!(c.backend_kind().is_none());
        assert!(c.state().last_error.is_some());
    }

    #[test]
    fn seek_updates_time_and_backend() {
        let (mut c, factory) = controller();
        c.set_url("/videos/a.mp4").unwrap();
        let opened = factory.last_file();
        opened.calls.take();

        c.seek(-3.0);
        c.seek(42.0);
        assert_eq!(opened.calls.take(), vec![Call::Seek(0.0), Call::Seek(42.0)]);
        assert!((c.state().current_time - 42.0).abs() < 1e-10);
    }

    #[test]
    fn commands_without_backend_are_noops() {
        let (mut c, factory) = controller();
        c.play();
        c.pause();
        c.seek(5.0);
        c.set_volume(0.2);
        assert!(!c.state().is_playing);
        assert_eq!(factory.opened(), (0, 0));
        assert_eq!(c.update().events, 0);
    }

    #[test]
    fn drop_stops_poll() {
        let (mut c, factory) = controller();
        c.set_url("https://youtu.be/xyz").unwrap();
        let opened = factory.last_embedded();
        opened.events.send(BackendEvent::Ready).unwrap();
        c.update();
        drop(c);

        let reads = opened.player.reads();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(opened.player.reads(), reads);
        assert_eq!(opened.player.stale_reads(), 0);
    }
}
