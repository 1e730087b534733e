//! Recording fakes for controller and session tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::backend::{BackendFactory, EmbedConfig, EmbeddedPlayer, EventSender, MediaElement};
use super::types::BackendKind;
use crate::error::PlayerError;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Play,
    Pause,
    Stop,
    SetVolume(f64),
    Seek(f64),
}

/// Shared call log.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    /// Drain recorded calls.
    pub fn take(&self) -> Vec<Call> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

pub struct FakeElement {
    calls: CallLog,
}

impl FakeElement {
    pub fn new() -> Self {
        Self {
            calls: CallLog::default(),
        }
    }

    pub fn calls(&self) -> CallLog {
        self.calls.clone()
    }
}

impl MediaElement for FakeElement {
    fn play(&mut self) {
        self.calls.push(Call::Play);
    }

    fn pause(&mut self) {
        self.calls.push(Call::Pause);
    }

    fn stop(&mut self) {
        self.calls.push(Call::Stop);
    }

    fn set_volume(&mut self, volume: f64) {
        self.calls.push(Call::SetVolume(volume));
    }

    fn seek(&mut self, secs: f64) {
        self.calls.push(Call::Seek(secs));
    }
}

/// Embedded fake whose clock is set by the test. Any time read after
/// `stop_video` is counted as a stale read.
pub struct FakeEmbedded {
    calls: CallLog,
    time: Mutex<f64>,
    stopped: AtomicBool,
    reads: AtomicUsize,
    stale_reads: AtomicUsize,
}

impl FakeEmbedded {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: CallLog::default(),
            time: Mutex::new(0.0),
            stopped: AtomicBool::new(false),
            reads: AtomicUsize::new(0),
            stale_reads: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> CallLog {
        self.calls.clone()
    }

    pub fn set_time(&self, secs: f64) {
        *self.time.lock().unwrap() = secs;
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn stale_reads(&self) -> usize {
        self.stale_reads.load(Ordering::SeqCst)
    }
}

impl EmbeddedPlayer for FakeEmbedded {
    fn play_video(&self) {
        self.calls.push(Call::Play);
    }

    fn pause_video(&self) {
        self.calls.push(Call::Pause);
    }

    fn stop_video(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.calls.push(Call::Stop);
    }

    fn set_volume(&self, volume: u8) {
        self.calls.push(Call::SetVolume(volume as f64));
    }

    fn seek_to(&self, secs: f64) {
        self.calls.push(Call::Seek(secs));
    }

    fn current_time(&self) -> f64 {
        if self.stopped.load(Ordering::SeqCst) {
            self.stale_reads.fetch_add(1, Ordering::SeqCst);
        }
        self.reads.fetch_add(1, Ordering::SeqCst);
        *self.time.lock().unwrap()
    }
}

#[derive(Clone)]
pub struct OpenedFile {
    pub url: String,
    pub calls: CallLog,
    pub events: EventSender,
}

#[derive(Clone)]
pub struct OpenedEmbedded {
    pub media_id: String,
    pub config: EmbedConfig,
    pub player: Arc<FakeEmbedded>,
    pub events: EventSender,
}

#[derive(Default)]
struct FactoryLog {
    files: Vec<OpenedFile>,
    embedded: Vec<OpenedEmbedded>,
    fail_next: Option<String>,
}

/// Factory handing out fakes. Clones share the same log.
#[derive(Clone, Default)]
pub struct FakeFactory {
    log: Arc<Mutex<FactoryLog>>,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_file(&self) -> OpenedFile {
        self.log.lock().unwrap().files.last().cloned().unwrap()
    }

    pub fn last_embedded(&self) -> OpenedEmbedded {
        self.log.lock().unwrap().embedded.last().cloned().unwrap()
    }

    pub fn opened(&self) -> (usize, usize) {
        let log = self.log.lock().unwrap();
        (log.files.len(), log.embedded.len())
    }

    pub fn fail_next(&self, detail: &str) {
        self.log.lock().unwrap().fail_next = Some(detail.to_string());
    }
}

impl BackendFactory for FakeFactory {
    fn open_file(
        &mut self,
        url: &str,
        events: EventSender,
    ) -> Result<Box<dyn MediaElement>, PlayerError> {
        let mut log = self.log.lock().unwrap();
        if let Some(detail) = log.fail_next.take() {
            return Err(PlayerError::BackendUnavailable {
                backend: BackendKind::DirectFile,
                detail,
            });
        }
        let element = FakeElement::new();
        log.files.push(OpenedFile {
            url: url.to_string(),
            calls: element.calls(),
            events,
        });
        Ok(Box::new(element))
    }

    fn open_embedded(
        &mut self,
        media_id: &str,
        config: &EmbedConfig,
        events: EventSender,
    ) -> Result<Arc<dyn EmbeddedPlayer>, PlayerError> {
        let mut log = self.log.lock().unwrap();
        if let Some(detail) = log.fail_next.take() {
            return Err(PlayerError::BackendUnavailable {
                backend: BackendKind::Embedded,
                detail,
            });
        }
        let player = FakeEmbedded::new();
        log.embedded.push(OpenedEmbedded {
            media_id: media_id.to_string(),
            config: config.clone(),
            player: Arc::clone(&player),
            events,
        });
        Ok(player)
    }
}
