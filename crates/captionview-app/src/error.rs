use thiserror::Error;

use crate::playback::types::BackendKind;

/// Errors surfaced by the playback engine. The `Display` text is what the
/// user sees in the error region; none of these are fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlayerError {
    /// Unparseable URL, or an embedded-platform URL with no media identifier.
    #[error("Invalid video URL: {0}")]
    InvalidVideoUrl(String),
    /// The active backend reported a runtime failure.
    #[error("{}", .backend.error_message())]
    BackendPlayback { backend: BackendKind, detail: String },
    /// Caption entry rejected (strict mode only).
    #[error("Invalid caption: {0}")]
    InvalidCaption(String),
    /// The backend factory could not create a handle for the source.
    #[error("Could not open {backend} backend: {detail}")]
    BackendUnavailable { backend: BackendKind, detail: String },
}

impl PlayerError {
    /// Backend-side detail, if any, for logging.
    pub fn detail(&self) -> Option<&str> {
        match self {
            PlayerError::BackendPlayback { detail, .. }
            | PlayerError::BackendUnavailable { detail, .. } => Some(detail),
            PlayerError::InvalidVideoUrl(_) | PlayerError::InvalidCaption(_) => None,
        }
    }
}
