//! Track ingestion.
//!
//! Probes each source file for its primary visual track, natural size,
//! and duration. Probing is read-only.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use collage_common::error::{CollageError, CollageResult, IngestionFailure};
use collage_model::{SourceMedia, VisualTrack, SLOT_COUNT};

/// What a probe learned about one container.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    /// Usable video streams in container order.
    pub visual_tracks: Vec<VisualTrack>,

    /// Container duration in seconds, if known.
    pub duration_secs: Option<f64>,
}

/// Capability to inspect a local media container.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// Read stream and duration information from `path`.
    async fn probe(&self, path: &Path) -> Result<MediaInfo, IngestionFailure>;

    /// Probe name.
    fn name(&self) -> &str;
}

/// Result of ingesting one input.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub path: PathBuf,
    pub result: Result<SourceMedia, IngestionFailure>,
}

/// Ingest a single file into a [`SourceMedia`].
pub async fn ingest_source(
    probe: &dyn MediaProbe,
    path: &Path,
) -> Result<SourceMedia, IngestionFailure> {
    let info = probe.probe(path).await?;

    let track = info
        .visual_tracks
        .into_iter()
        .next()
        .ok_or(IngestionFailure::NoVisualTrack)?;
    if track.width == 0 || track.height == 0 {
        return Err(IngestionFailure::NoVisualTrack);
    }

    let duration_secs = info
        .duration_secs
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or(IngestionFailure::ZeroDuration)?;

    tracing::debug!(
        path = %path.display(),
        codec = %track.codec,
        width = track.width,
        height = track.height,
        duration_secs,
        "Source ingested"
    );

    Ok(SourceMedia::new(path, track, duration_secs))
}

/// Ingest every input, reporting success or a typed failure per item.
pub async fn ingest_sources(probe: &dyn MediaProbe, paths: &[PathBuf]) -> Vec<IngestOutcome> {
    let mut outcomes = Vec::with_capacity(paths.len());
    for path in paths {
        let result = ingest_source(probe, path).await;
        if let Err(failure) = &result {
            tracing::warn!(path = %path.display(), %failure, "Source rejected");
        }
        outcomes.push(IngestOutcome {
            path: path.clone(),
            result,
        });
    }
    outcomes
}

/// Ingest exactly one source per slot, aborting on the first failure.
pub async fn ingest_for_export(
    probe: &dyn MediaProbe,
    paths: &[PathBuf],
) -> CollageResult<Vec<SourceMedia>> {
    if paths.len() != SLOT_COUNT {
        return Err(CollageError::precondition(format!(
            "exactly {SLOT_COUNT} videos are required, got {}",
            paths.len()
        )));
    }

    tracing::info!(probe = probe.name(), sources = paths.len(), "Ingesting sources");

    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        let source = ingest_source(probe, path)
            .await
            .map_err(|failure| CollageError::ingestion(path, failure))?;
        sources.push(source);
    }
    Ok(sources)
}

/// Probe backed by the `ffprobe` executable.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    binary: String,
}

impl FfprobeProbe {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Whether the configured binary can be executed.
    pub fn is_available(&self) -> bool {
        std::process::Command::new(&self.binary)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, IngestionFailure> {
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            IngestionFailure::UnreadableSource(format!("{}: {e}", path.display()))
        })?;
        if !metadata.is_file() {
            return Err(IngestionFailure::UnreadableSource(format!(
                "{} is not a regular file",
                path.display()
            )));
        }

        let output = Command::new(&self.binary)
            .args([
                "-v",
                "error",
                "-show_entries",
                "stream=index,codec_type,codec_name,width,height,duration:\
                 stream_disposition=attached_pic:stream_tags=rotate:\
                 stream_side_data=rotation:format=duration",
                "-of",
                "json",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                IngestionFailure::UnreadableSource(format!("failed to run {}: {e}", self.binary))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.trim();
            return Err(IngestionFailure::UnreadableSource(if detail.is_empty() {
                format!("{} exited with {}", self.binary, output.status)
            } else {
                detail.to_string()
            }));
        }

        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }

    fn name(&self) -> &str {
        "ffprobe"
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    index: u32,
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
    disposition: Option<ProbeDisposition>,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
    tags: Option<ProbeTags>,
}

impl ProbeStream {
    /// Display rotation in degrees, normalized to `[0, 360)`.
    ///
    /// The display matrix wins over the legacy `rotate` tag.
    fn rotation_degrees(&self) -> i64 {
        let raw = self
            .side_data_list
            .iter()
            .find_map(|side| side.rotation)
            .or_else(|| {
                self.tags
                    .as_ref()
                    .and_then(|t| t.rotate.as_deref())
                    .and_then(|r| r.trim().parse::<f64>().ok())
            })
            .filter(|r| r.is_finite())
            .unwrap_or(0.0);
        (raw.round() as i64).rem_euclid(360)
    }
}

#[derive(Debug, Deserialize)]
struct ProbeDisposition {
    #[serde(default)]
    attached_pic: u8,
}

#[derive(Debug, Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ProbeTags {
    rotate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Parse `ffprobe -of json` output into [`MediaInfo`].
///
/// Cover art (attached pictures) and streams without a frame size are
/// skipped but still counted for `v:N` addressing. Frame sizes are reported
/// as displayed: ffmpeg auto-rotates on decode, so quarter-turn rotations
/// swap the coded width and height.
pub fn parse_probe_output(json: &str) -> Result<MediaInfo, IngestionFailure> {
    let parsed: ProbeOutput = serde_json::from_str(json).map_err(|e| {
        IngestionFailure::UnreadableSource(format!("unparsable probe output: {e}"))
    })?;

    let mut visual_tracks = Vec::new();
    let mut first_track_duration = None;
    let mut video_index = 0u32;

    for stream in &parsed.streams {
        if stream.codec_type.as_deref() != Some("video") {
            continue;
        }
        let this_index = video_index;
        video_index += 1;

        let attached = stream
            .disposition
            .as_ref()
            .map(|d| d.attached_pic != 0)
            .unwrap_or(false);
        let (width, height) = match (stream.width, stream.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => continue,
        };
        let (width, height) = match stream.rotation_degrees() {
            90 | 270 => (height, width),
            _ => (width, height),
        };
        if attached {
            continue;
        }

        if visual_tracks.is_empty() {
            first_track_duration = parse_duration(stream.duration.as_deref());
        }
        visual_tracks.push(VisualTrack {
            video_index: this_index,
            stream_index: stream.index,
            codec: stream
                .codec_name
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            width,
            height,
        });
    }

    let duration_secs = parsed
        .format
        .as_ref()
        .and_then(|f| parse_duration(f.duration.as_deref()))
        .or(first_track_duration);

    Ok(MediaInfo {
        visual_tracks,
        duration_secs,
    })
}

fn parse_duration(raw: Option<&str>) -> Option<f64> {
    raw?.trim().parse::<f64>().ok().filter(|d| d.is_finite())
}
