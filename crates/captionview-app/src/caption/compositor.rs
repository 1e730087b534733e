use serde::{Deserialize, Serialize};

use super::store::Caption;

/// Half-width of the caption window in seconds.
pub const DEFAULT_CAPTION_WINDOW: f64 = 1.0;

/// How to choose between captions that are all inside the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Earliest-inserted match wins, even if a later one is closer.
    #[default]
    FirstInserted,
    /// Closest in time wins; ties go to the earlier entry.
    Closest,
}

/// Picks the caption to overlay for a playback time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptionCompositor {
    pub window: f64,
    pub policy: MatchPolicy,
}

impl Default for CaptionCompositor {
    fn default() -> Self {
        Self {
            window: DEFAULT_CAPTION_WINDOW,
            policy: MatchPolicy::FirstInserted,
        }
    }
}

impl CaptionCompositor {
    pub fn new(window: f64, policy: MatchPolicy) -> Self {
        Self { window, policy }
    }

    /// A caption is visible while `|caption.time - now| < window` (strict).
    pub fn in_window(&self, caption: &Caption, now: f64) -> bool {
        (caption.time - now).abs() < self.window
    }

    pub fn select<'a>(&self, captions: &'a [Caption], now: f64) -> Option<&'a Caption> {
        let mut matches = captions.iter().filter(|c| self.in_window(c, now));
        match self.policy {
            MatchPolicy::FirstInserted => matches.next(),
            MatchPolicy::Closest => matches.fold(None, |best: Option<&Caption>, c| match best {
                Some(b) if (b.time - now).abs() <= (c.time - now).abs() => Some(b),
                _ => Some(c),
            }),
        }
    }

    /// Overlay text for `now`, or `None` when nothing should be drawn.
    pub fn render<'a>(&self, captions: &'a [Caption], now: f64) -> Option<&'a str> {
        self.select(captions, now).map(|c| c.text.as_str())
    }
}
