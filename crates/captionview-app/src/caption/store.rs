use crate::error::PlayerError;

/// A user-entered caption. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Caption {
    pub text: String,
    /// Seconds from the start of the video.
    pub time: f64,
}

/// Pending caption entry: the raw text and time fields before submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptionDraft {
    pub text: String,
    pub time: String,
}

impl CaptionDraft {
    pub fn clear(&mut self) {
        self.text.clear();
        self.time.clear();
    }
}

/// In-memory captions for one session, in insertion order. Nothing is
/// persisted; there is no remove or edit.
#[derive(Debug, Clone, Default)]
pub struct CaptionStore {
    captions: Vec<Caption>,
}

impl CaptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a caption, silently ignoring empty text or an unparseable time.
    /// Returns whether an entry was appended.
    pub fn add(&mut self, text: &str, time: &str) -> bool {
        match self.try_add(text, time) {
            Ok(_) => true,
            Err(e) => {
                log::debug!("Caption ignored: {e}");
                false
            }
        }
    }

    /// Strict variant of [`CaptionStore::add`] that reports why an entry was rejected.
    pub fn try_add(&mut self, text: &str, time: &str) -> Result<&Caption, PlayerError> {
        if text.is_empty() {
            return Err(PlayerError::InvalidCaption("caption text is empty".into()));
        }
        let time = parse_time(time)?;
        self.captions.push(Caption {
            text: text.to_string(),
            time,
        });
        let idx = self.captions.len() - 1;
        log::info!("Caption added at {time:.2}s ({} total)", self.captions.len());
        Ok(&self.captions[idx])
    }

    /// Submit a draft. On success the draft is cleared; on rejection it is left as is.
    pub fn submit(&mut self, draft: &mut CaptionDraft) -> bool {
        let added = self.add(&draft.text, &draft.time);
        if added {
            draft.clear();
        }
        added
    }

    /// Strict variant of [`CaptionStore::submit`].
    pub fn try_submit(&mut self, draft: &mut CaptionDraft) -> Result<(), PlayerError> {
        self.try_add(&draft.text, &draft.time)?;
        draft.clear();
        Ok(())
    }

    pub fn captions(&self) -> &[Caption] {
        &self.captions
    }

    pub fn len(&self) -> usize {
        self.captions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captions.is_empty()
    }
}

/// Parse a timestamp field. Must be a finite, non-negative number of seconds.
fn parse_time(raw: &str) -> Result<f64, PlayerError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PlayerError::InvalidCaption("timestamp is empty".into()));
    }
    let secs: f64 = trimmed
        .parse()
        .map_err(|_| PlayerError::InvalidCaption(format!("'{trimmed}' is not a number")))?;
    if !secs.is_finite() {
        return Err(PlayerError::InvalidCaption(format!("'{trimmed}' is not finite")));
    }
    if secs < 0.0 {
        return Err(PlayerError::InvalidCaption(format!("'{trimmed}' is negative")));
    }
    Ok(secs)
}
