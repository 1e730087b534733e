//! Headless backends: keep playback time against the wall clock without
//! rendering anything. They let the engine run end to end from the console
//! and behave like the real players where the controller can tell:
//! - the file element validates its resource on the first play, pushes
//!   `TimeUpdate` on a fixed cadence and pauses itself at the end;
//! - the embedded player signals `Ready` once created, reports state changes
//!   and only answers time when asked.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};

use super::backend::{BackendFactory, EmbedConfig, EmbeddedPlayer, EventSender, MediaElement};
use super::probe::{self, DEFAULT_FFPROBE, ProbeOutcome};
use super::types::{BackendEvent, BackendKind, EmbeddedState};
use crate::error::PlayerError;

/// Default cadence of pushed time updates (matches typical media elements).
pub const DEFAULT_FILE_TICK: Duration = Duration::from_millis(250);

/// Position bookkeeping: a base offset plus the time elapsed since the last
/// play, capped at the duration when one is known.
#[derive(Debug, Clone)]
pub struct WallClock {
    base: f64,
    started: Option<Instant>,
    duration: Option<f64>,
}

impl WallClock {
    pub fn new(duration: Option<f64>) -> Self {
        Self {
            base: 0.0,
            started: None,
            duration,
        }
    }

    pub fn set_duration(&mut self, duration: Option<f64>) {
        self.duration = duration;
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    pub fn position(&self, now: Instant) -> f64 {
        let elapsed = self
            .started
            .map(|s| now.saturating_duration_since(s).as_secs_f64())
            .unwrap_or(0.0);
        let pos = self.base + elapsed;
        match self.duration {
            Some(d) => pos.min(d),
            None => pos,
        }
    }

    pub fn at_end(&self, now: Instant) -> bool {
        self.duration.is_some_and(|d| self.position(now) >= d)
    }

    pub fn start(&mut self, now: Instant) {
        if self.at_end(now) {
            self.base = 0.0;
        }
        if self.started.is_none() {
            self.started = Some(now);
        }
    }

    pub fn halt(&mut self, now: Instant) {
        self.base = self.position(now);
        self.started = None;
    }

    pub fn seek(&mut self, secs: f64, now: Instant) {
        let secs = secs.max(0.0);
        self.base = match self.duration {
            Some(d) => secs.min(d),
            None => secs,
        };
        if self.started.is_some() {
            self.started = Some(now);
        }
    }

    pub fn reset(&mut self) {
        self.base = 0.0;
        self.started = None;
    }
}

enum FileCommand {
    Play,
    Pause,
    Stop,
    Volume(f64),
    Seek(f64),
}

/// Headless direct-file element. Commands go to a worker thread; outcomes
/// come back as events.
///
/// `stop` and drop also raise a cancel flag so a probe still running on the
/// worker is killed instead of being waited out.
pub struct HeadlessFile {
    commands: Option<Sender<FileCommand>>,
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl HeadlessFile {
    pub fn open(
        url: &str,
        tick: Duration,
        ffprobe: &Path,
        events: EventSender,
    ) -> anyhow::Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let cancel = Arc::new(AtomicBool::new(false));
        let worker = FileWorker {
            url: url.to_string(),
            ffprobe: ffprobe.to_path_buf(),
            events,
            cancel: cancel.clone(),
            clock: WallClock::new(None),
            probed: false,
            volume: 1.0,
        };
        let tick = tick.max(Duration::from_millis(1));
        let thread = std::thread::Builder::new()
            .name("captionview-file".into())
            .spawn(move || worker.run(&rx, tick))?;
        Ok(Self {
            commands: Some(tx),
            cancel,
            thread: Some(thread),
        })
    }

    fn send(&self, command: FileCommand) {
        if let Some(tx) = &self.commands {
            let _ = tx.send(command);
        }
    }
}

impl MediaElement for HeadlessFile {
    fn play(&mut self) {
        self.send(FileCommand::Play);
    }

    fn pause(&mut self) {
        self.send(FileCommand::Pause);
    }

    fn stop(&mut self) {
        self.cancel.store(true, Ordering::Release);
        self.send(FileCommand::Stop);
    }

    fn set_volume(&mut self, volume: f64) {
        self.send(FileCommand::Volume(volume));
    }

    fn seek(&mut self, secs: f64) {
        self.send(FileCommand::Seek(secs));
    }
}

impl Drop for HeadlessFile {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Release);
        self.commands = None;
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

enum Wake {
    Command(FileCommand),
    Tick,
    Closed,
}

struct FileWorker {
    url: String,
    ffprobe: PathBuf,
    events: EventSender,
    cancel: Arc<AtomicBool>,
    clock: WallClock,
    probed: bool,
    volume: f64,
}

impl FileWorker {
    fn run(mut self, commands: &Receiver<FileCommand>, tick: Duration) {
        let ticker = crossbeam_channel::tick(tick);
        loop {
            let wake = crossbeam_channel::select! {
                recv(commands) -> cmd => cmd.map_or(Wake::Closed, Wake::Command),
                recv(ticker) -> _ => Wake::Tick,
            };
            match wake {
                Wake::Command(cmd) => self.handle(cmd, Instant::now()),
                Wake::Tick => self.tick(Instant::now()),
                Wake::Closed => break,
            }
        }
        log::debug!("File worker for {} stopped", self.url);
    }

    fn emit(&self, event: BackendEvent) {
        let _ = self.events.send(event);
    }

    fn handle(&mut self, cmd: FileCommand, now: Instant) {
        match cmd {
            FileCommand::Play => {
                if !self.probed && !self.probe() {
                    return;
                }
                if !self.clock.is_running() {
                    self.clock.start(now);
                    self.emit(BackendEvent::Play);
                }
            }
            FileCommand::Pause => {
                if self.clock.is_running() {
                    self.clock.halt(now);
                    self.emit(BackendEvent::Pause);
                    self.emit(BackendEvent::TimeUpdate(self.clock.position(now)));
                }
            }
            FileCommand::Stop => {
                // Any probe the flag was meant for has returned by now.
                self.cancel.store(false, Ordering::Release);
                let was_running = self.clock.is_running();
                self.clock.reset();
                if was_running {
                    self.emit(BackendEvent::Pause);
                }
            }
            FileCommand::Volume(v) => {
                self.volume = v;
                log::debug!("File volume {:.2}", self.volume);
            }
            FileCommand::Seek(secs) => {
                self.clock.seek(secs, now);
                self.emit(BackendEvent::TimeUpdate(self.clock.position(now)));
            }
        }
    }

    /// Validate the resource on first play. Failures are reported as events;
    /// a cancelled probe reports nothing and is retried on the next play.
    fn probe(&mut self) -> bool {
        let cancel = &self.cancel;
        match probe::probe_media(&self.url, &self.ffprobe, || cancel.load(Ordering::Acquire)) {
            Ok(ProbeOutcome::Done(info)) => {
                log::info!(
                    "Probed {}: duration {}",
                    self.url,
                    info.duration_secs
                        .map_or_else(|| "unknown".to_string(), |d| format!("{d:.2}s"))
                );
                self.clock.set_duration(info.duration_secs);
                self.probed = true;
                true
            }
            Ok(ProbeOutcome::Cancelled) => false,
            Err(e) => {
                self.emit(BackendEvent::Error(e.to_string()));
                false
            }
        }
    }

    fn tick(&mut self, now: Instant) {
        if !self.clock.is_running() {
            return;
        }
        self.emit(BackendEvent::TimeUpdate(self.clock.position(now)));
        if self.clock.at_end(now) {
            self.clock.halt(now);
            self.emit(BackendEvent::Pause);
        }
    }
}

/// Headless embedded player keeping its own clock.
pub struct HeadlessEmbedded {
    media_id: String,
    clock: Mutex<WallClock>,
    volume: AtomicU8,
    events: EventSender,
}

impl HeadlessEmbedded {
    pub fn create(media_id: &str, config: &EmbedConfig, events: EventSender) -> Arc<Self> {
        log::info!(
            "Embedded player for {media_id} ({}x{}, autoplay {})",
            config.width,
            config.height,
            config.autoplay
        );
        let player = Arc::new(Self {
            media_id: media_id.to_string(),
            clock: Mutex::new(WallClock::new(None)),
            volume: AtomicU8::new(100),
            events,
        });
        let _ = player.events.send(BackendEvent::Ready);
        player
    }

    pub fn media_id(&self) -> &str {
        &self.media_id
    }

    pub fn volume(&self) -> u8 {
        self.volume.load(Ordering::Relaxed)
    }

    fn with_clock<R>(&self, f: impl FnOnce(&mut WallClock) -> R) -> R {
        let mut clock = match self.clock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut clock)
    }

    fn emit_state(&self, state: EmbeddedState) {
        log::debug!("Embedded {} state {state:?} ({})", self.media_id, state as i32);
        let _ = self.events.send(BackendEvent::StateChange(state));
    }
}

impl EmbeddedPlayer for HeadlessEmbedded {
    fn play_video(&self) {
        self.with_clock(|c| c.start(Instant::now()));
        self.emit_state(EmbeddedState::Playing);
    }

    fn pause_video(&self) {
        self.with_clock(|c| c.halt(Instant::now()));
        self.emit_state(EmbeddedState::Paused);
    }

    fn stop_video(&self) {
        self.with_clock(WallClock::reset);
        self.emit_state(EmbeddedState::Cued);
    }

    fn set_volume(&self, volume: u8) {
        self.volume.store(volume.min(100), Ordering::Relaxed);
    }

    fn seek_to(&self, secs: f64) {
        self.with_clock(|c| c.seek(secs, Instant::now()));
    }

    fn current_time(&self) -> f64 {
        self.with_clock(|c| c.position(Instant::now()))
    }
}

/// Factory producing headless backends.
pub struct HeadlessFactory {
    file_tick: Duration,
    ffprobe: PathBuf,
}

impl HeadlessFactory {
    pub fn new(file_tick: Duration) -> Self {
        Self {
            file_tick,
            ffprobe: PathBuf::from(DEFAULT_FFPROBE),
        }
    }

    /// Use a specific ffprobe binary for direct-file validation.
    pub fn with_ffprobe(mut self, ffprobe: impl Into<PathBuf>) -> Self {
        self.ffprobe = ffprobe.into();
        self
    }
}

impl Default for HeadlessFactory {
    fn default() -> Self {
        Self::new(DEFAULT_FILE_TICK)
    }
}

impl BackendFactory for HeadlessFactory {
    fn open_file(
        &mut self,
        url: &str,
        events: EventSender,
    ) -> Result<Box<dyn MediaElement>, PlayerError> {
        let file = HeadlessFile::open(url, self.file_tick, &self.ffprobe, events).map_err(|e| {
            PlayerError::BackendUnavailable {
                backend: BackendKind::DirectFile,
                detail: e.to_string(),
            }
        })?;
        Ok(Box::new(file))
    }

    fn open_embedded(
        &mut self,
        media_id: &str,
        config: &EmbedConfig,
        events: EventSender,
    ) -> Result<Arc<dyn EmbeddedPlayer>, PlayerError> {
        Ok(HeadlessEmbedded::create(media_id, config, events))
    }
}
