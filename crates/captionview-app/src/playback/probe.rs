//! Direct-file validation via `ffprobe`.
//!
//! Runs on the headless file backend's worker thread the first time playback
//! is attempted, never on the controller's thread.

use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use anyhow::{Context, bail};
use crossbeam_channel::RecvTimeoutError;

/// Program looked up on `PATH` when no explicit path is configured.
pub const DEFAULT_FFPROBE: &str = "ffprobe";

/// How often a running probe checks for exit or cancellation.
const WAIT_STEP: Duration = Duration::from_millis(20);

/// What playback needs to know about a resource.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    /// `None` when the duration could not be determined (live, or no ffprobe).
    pub duration_secs: Option<f64>,
    pub has_video: bool,
}

impl MediaInfo {
    fn unknown() -> Self {
        Self {
            duration_secs: None,
            has_video: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Done(MediaInfo),
    /// The caller gave up; the ffprobe process was killed.
    Cancelled,
}

/// Local path behind a source string, if it refers to one.
pub fn local_path(source: &str) -> Option<&Path> {
    if let Some(rest) = source.strip_prefix("file://") {
        return Some(Path::new(rest));
    }
    if source.contains("://") {
        return None;
    }
    Some(Path::new(source))
}

/// Validate a source before playback starts.
///
/// Local paths must exist. When `ffprobe` can be started it must accept the
/// resource and find a video or audio stream; when it is not installed the
/// resource is assumed playable with unknown duration.
///
/// `cancelled` is checked every few milliseconds while ffprobe runs. Once it
/// returns true the child is killed and [`ProbeOutcome::Cancelled`] comes back.
pub fn probe_media(
    source: &str,
    ffprobe: &Path,
    cancelled: impl Fn() -> bool,
) -> anyhow::Result<ProbeOutcome> {
    if let Some(path) = local_path(source) {
        if !path.exists() {
            bail!("file not found: {}", path.display());
        }
    }

    let spawned = Command::new(ffprobe)
        .args([
            "-v", "quiet",
            "-print_format", "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn();
    let mut child = match spawned {
        Ok(child) => child,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::warn!(
                "{} not found, playing {source} with unknown duration",
                ffprobe.display()
            );
            return Ok(ProbeOutcome::Done(MediaInfo::unknown()));
        }
        Err(e) => return Err(e).context("ffprobe failed to execute"),
    };

    let Some(stdout) = wait_for_output(&mut child, &cancelled)? else {
        log::debug!("Probe of {source} cancelled");
        return Ok(ProbeOutcome::Cancelled);
    };

    let json: serde_json::Value =
        serde_json::from_slice(&stdout).context("Failed to parse ffprobe JSON")?;
    parse_probe_json(&json).map(ProbeOutcome::Done)
}

/// Wait for ffprobe to finish and collect its stdout. `None` on cancellation.
fn wait_for_output(
    child: &mut Child,
    cancelled: &impl Fn() -> bool,
) -> anyhow::Result<Option<Vec<u8>>> {
    let mut stdout = child.stdout.take().context("ffprobe: no stdout pipe")?;

    // Read on a side thread so a full pipe never stalls the child while it is polled.
    let (out_tx, out_rx) = crossbeam_channel::bounded(1);
    let reader = std::thread::Builder::new()
        .name("captionview-probe-out".into())
        .spawn(move || {
            let mut buf = Vec::new();
            let _ = stdout.read_to_end(&mut buf);
            let _ = out_tx.send(buf);
        });
    if let Err(e) = reader {
        kill(child);
        return Err(e).context("Failed to start ffprobe reader");
    }

    let status = loop {
        if cancelled() {
            kill(child);
            return Ok(None);
        }
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => std::thread::sleep(WAIT_STEP),
            Err(e) => {
                kill(child);
                return Err(e).context("Failed to wait for ffprobe");
            }
        }
    };
    if !status.success() {
        bail!("ffprobe exited with {status}");
    }

    loop {
        if cancelled() {
            return Ok(None);
        }
        match out_rx.recv_timeout(WAIT_STEP) {
            Ok(buf) => return Ok(Some(buf)),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => bail!("ffprobe output lost"),
        }
    }
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn parse_probe_json(json: &serde_json::Value) -> anyhow::Result<MediaInfo> {
    let streams = json["streams"]
        .as_array()
        .context("No streams in ffprobe output")?;

    let has_video = streams
        .iter()
        .any(|s| s["codec_type"].as_str() == Some("video"));
    let has_audio = streams
        .iter()
        .any(|s| s["codec_type"].as_str() == Some("audio"));
    if !has_video && !has_audio {
        bail!("No playable stream found");
    }

    let duration_secs = json["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .or_else(|| {
            streams
                .iter()
                .find_map(|s| s["duration"].as_str().and_then(|d| d.parse::<f64>().ok()))
        })
        .filter(|d| d.is_finite() && *d > 0.0);

    Ok(MediaInfo {
        duration_secs,
        has_video,
    })
}
