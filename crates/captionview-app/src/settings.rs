use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::caption::{CaptionCompositor, MatchPolicy};
use crate::playback::PlaybackConfig;
use crate::playback::backend::EmbedConfig;
use crate::playback::probe::DEFAULT_FFPROBE;

/// User settings (~/.config/captionview/settings.json). Session data such as
/// captions and the current URL is never written here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_caption_window_secs")]
    pub caption_window_secs: f64,
    #[serde(default)]
    pub caption_match: MatchPolicy,
    #[serde(default)]
    pub strict_captions: bool,
    #[serde(default = "default_volume")]
    pub initial_volume: f32,
    #[serde(default)]
    pub embed: EmbedConfig,
    #[serde(default = "default_file_tick_ms")]
    pub file_tick_ms: u64,
    #[serde(default = "default_render_interval_ms")]
    pub render_interval_ms: u64,
    /// ffprobe binary used to validate direct files; looked up on `PATH` by name.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,
}

fn default_version() -> u32 {
    1
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_caption_window_secs() -> f64 {
    1.0
}

fn default_volume() -> f32 {
    1.0
}

fn default_file_tick_ms() -> u64 {
    250
}

fn default_render_interval_ms() -> u64 {
    100
}

fn default_ffprobe_path() -> String {
    DEFAULT_FFPROBE.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: 1,
            poll_interval_ms: 100,
            caption_window_secs: 1.0,
            caption_match: MatchPolicy::FirstInserted,
            strict_captions: false,
            initial_volume: 1.0,
            embed: EmbedConfig::default(),
            file_tick_ms: 250,
            render_interval_ms: 100,
            ffprobe_path: default_ffprobe_path(),
        }
    }
}

impl Settings {
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("captionview").join("settings.json")
    }

    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Self>(&contents) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings.sanitized()
                }
                Err(e) => {
                    log::warn!("Failed to parse settings: {e}");
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("No settings found, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self) -> anyhow::Result<PathBuf> {
        let path = Self::config_path();
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("Saved settings to {}", path.display());
        Ok(())
    }

    /// Pull out-of-range values back to something usable.
    fn sanitized(mut self) -> Self {
        if self.poll_interval_ms == 0 {
            self.poll_interval_ms = default_poll_interval_ms();
        }
        if !self.caption_window_secs.is_finite() || self.caption_window_secs <= 0.0 {
            self.caption_window_secs = default_caption_window_secs();
        }
        self.initial_volume = if self.initial_volume.is_finite() {
            self.initial_volume.clamp(0.0, 1.0)
        } else {
            default_volume()
        };
        if self.file_tick_ms == 0 {
            self.file_tick_ms = default_file_tick_ms();
        }
        if self.render_interval_ms == 0 {
            self.render_interval_ms = default_render_interval_ms();
        }
        if self.ffprobe_path.trim().is_empty() {
            self.ffprobe_path = default_ffprobe_path();
        }
        self
    }

    pub fn playback_config(&self) -> PlaybackConfig {
        PlaybackConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            embed: self.embed.clone(),
            initial_volume: self.initial_volume,
        }
    }

    pub fn compositor(&self) -> CaptionCompositor {
        CaptionCompositor::new(self.caption_window_secs, self.caption_match)
    }

    pub fn file_tick(&self) -> Duration {
        Duration::from_millis(self.file_tick_ms)
    }

    pub fn render_interval(&self) -> Duration {
        Duration::from_millis(self.render_interval_ms)
    }

    pub fn ffprobe(&self) -> PathBuf {
        PathBuf::from(&self.ffprobe_path)
    }
}
