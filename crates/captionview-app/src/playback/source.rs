//! Classifies a raw URL string into the backend that should play it.

use url::Url;

use super::types::BackendKind;
use crate::error::PlayerError;

/// Short-link host: the media id is the path.
const SHORT_LINK_HOSTS: &[&str] = &["youtu.be"];
/// Canonical hosts: the media id is the `v` query parameter.
const CANONICAL_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
];

/// Which backend a URL resolves to. Exactly one variant is active at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlaybackSource {
    #[default]
    Unset,
    Embedded { media_id: String },
    DirectFile { url: String },
}

impl PlaybackSource {
    pub fn kind(&self) -> Option<BackendKind> {
        match self {
            PlaybackSource::Unset => None,
            PlaybackSource::Embedded { .. } => Some(BackendKind::Embedded),
            PlaybackSource::DirectFile { .. } => Some(BackendKind::DirectFile),
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, PlaybackSource::Unset)
    }
}

/// Classify a raw URL string.
///
/// - empty (after trimming) → `Unset`
/// - short-link host → `Embedded`, id = path without the leading `/`
/// - canonical host → `Embedded`, id = `v` query parameter
/// - anything else → `DirectFile`, unvalidated until playback is attempted
///
/// A string with no scheme that fails to parse is treated as a direct file
/// (local paths are valid sources) unless it names an embedded-platform
/// domain. A string that carries a scheme but fails to parse is malformed.
pub fn classify(raw: &str) -> Result<PlaybackSource, PlayerError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(PlaybackSource::Unset);
    }

    let parsed = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(e) => {
            if has_scheme(trimmed) || mentions_embedded_domain(trimmed) {
                return Err(PlayerError::InvalidVideoUrl(format!("{trimmed}: {e}")));
            }
            return Ok(PlaybackSource::DirectFile {
                url: trimmed.to_string(),
            });
        }
    };

    let host = parsed
        .host_str()
        .map(|h| h.to_ascii_lowercase())
        .unwrap_or_default();

    if SHORT_LINK_HOSTS.contains(&host.as_str()) {
        let id = parsed.path().trim_start_matches('/');
        return embedded(id, trimmed);
    }

    if CANONICAL_HOSTS.contains(&host.as_str()) {
        let id = parsed
            .query_pairs()
            .find(|(k, _)| k == "v")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();
        return embedded(&id, trimmed);
    }

    Ok(PlaybackSource::DirectFile {
        url: trimmed.to_string(),
    })
}

fn embedded(id: &str, raw: &str) -> Result<PlaybackSource, PlayerError> {
    if id.is_empty() {
        return Err(PlayerError::InvalidVideoUrl(format!("no video id in {raw}")));
    }
    Ok(PlaybackSource::Embedded {
        media_id: id.to_string(),
    })
}

/// `scheme://` anywhere, or a leading `scheme:` of two or more characters.
/// Single letters are left alone so drive-letter paths stay local.
fn has_scheme(raw: &str) -> bool {
    if raw.contains("://") {
        return true;
    }
    let Some((scheme, _)) = raw.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    scheme.len() > 1
        && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn mentions_embedded_domain(raw: &str) -> bool {
    let lower = raw.to_ascii_lowercase();
    SHORT_LINK_HOSTS
        .iter()
        .chain(CANONICAL_HOSTS)
        .any(|host| lower.contains(host))
}
