//! Encoder backends.
//!
//! An [`Encoder`] turns a [`CollageTimeline`] into a single output file and
//! reports its progress through a shared [`ProgressCell`]. The export job
//! samples that cell on its own schedule.

use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use collage_common::error::{CollageError, CollageResult};
use collage_model::{CollageTimeline, LayerInstruction, CANVAS_HEIGHT, CANVAS_WIDTH, FRAME_RATE};

/// Encoder progress in `[0.0, 1.0]`, shared between the encoder and its sampler.
#[derive(Debug, Clone, Default)]
pub struct ProgressCell(Arc<AtomicU64>);

impl ProgressCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Release);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }
}

/// The fixed output profile.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputProfile {
    /// Muxer name passed to `-f`.
    pub container: String,
    pub video_codec: String,
    pub preset: String,
    /// Constant rate factor (lower is better quality).
    pub crf: u8,
    pub pixel_format: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl OutputProfile {
    /// Highest-quality single-pass QuickTime export at the collage canvas size.
    pub fn highest_quality() -> Self {
        Self {
            container: "mov".to_string(),
            video_codec: "libx264".to_string(),
            preset: "slow".to_string(),
            crf: 16,
            pixel_format: "yuv420p".to_string(),
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
            fps: FRAME_RATE,
        }
    }

    /// Encoder arguments placed before the output path.
    fn codec_args(&self) -> Vec<String> {
        vec![
            "-c:v".to_string(),
            self.video_codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-pix_fmt".to_string(),
            self.pixel_format.clone(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            "-f".to_string(),
            self.container.clone(),
        ]
    }
}

impl Default for OutputProfile {
    fn default() -> Self {
        Self::highest_quality()
    }
}

/// Capability to encode a collage timeline into one output file.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Backend name.
    fn name(&self) -> &str;

    /// Check if this backend is usable on the system.
    fn is_available(&self) -> bool;

    /// Encode `timeline` into `output`, updating `progress` while running.
    ///
    /// Dropping the returned future must stop the encode.
    async fn encode(
        &self,
        timeline: &CollageTimeline,
        profile: &OutputProfile,
        output: &Path,
        progress: &ProgressCell,
    ) -> CollageResult<()>;
}

/// Encoder backed by the `ffmpeg` executable.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    binary: String,
}

impl FfmpegEncoder {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn is_available(&self) -> bool {
        std::process::Command::new(&self.binary)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    async fn encode(
        &self,
        timeline: &CollageTimeline,
        profile: &OutputProfile,
        output: &Path,
        progress: &ProgressCell,
    ) -> CollageResult<()> {
        let args = build_ffmpeg_args(timeline, profile, output);
        tracing::debug!(args = ?args, "Running ffmpeg");

        let start = std::time::Instant::now();
        let mut command = Command::new(&self.binary);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Terminal signals go to the host only; cancellation is the exporter's call.
        #[cfg(unix)]
        command.process_group(0);
        let mut child = command
            .spawn()
            .map_err(|e| CollageError::session(format!("Failed to start {}: {e}", self.binary)))?;

        tracing::info!(
            pid = child.id(),
            total_frames = timeline.total_frames(),
            "ffmpeg process started"
        );

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CollageError::session("Failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| CollageError::session("Failed to capture ffmpeg stderr"))?;

        // ffmpeg blocks once its stderr pipe fills, so drain it alongside progress.
        let stderr_task = tokio::spawn(async move {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output).await {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut state = ProgressState::default();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| CollageError::export(format!("Failed reading ffmpeg progress: {e}")))?
        {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            state.update(key, value);
            if key == "progress" {
                progress.set(state.fraction(timeline.duration_secs));
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| CollageError::export(format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr_output = stderr_task
            .await
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(CollageError::export(format!(
                "ffmpeg exited with {status}: {}",
                stderr_output.trim()
            )));
        }

        progress.set(1.0);
        tracing::info!(
            elapsed_ms = start.elapsed().as_millis(),
            output = %output.display(),
            "ffmpeg finished"
        );
        Ok(())
    }
}

/// Full ffmpeg argument list for one collage export.
pub fn build_ffmpeg_args(
    timeline: &CollageTimeline,
    profile: &OutputProfile,
    output: &Path,
) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-nostats".to_string(),
        "-progress".to_string(),
        "pipe:1".to_string(),
    ];

    for layer in timeline.layers() {
        args.push("-i".to_string());
        args.push(layer.source_path.display().to_string());
    }

    args.push("-filter_complex".to_string());
    args.push(build_filter_graph(timeline, profile));
    args.push("-map".to_string());
    args.push("[vout]".to_string());
    args.push("-an".to_string());
    args.push("-r".to_string());
    args.push(profile.fps.to_string());
    args.push("-t".to_string());
    args.push(format!("{:.6}", timeline.duration_secs));
    args.append(&mut profile.codec_args());
    args.push(output.display().to_string());
    args
}

/// Filter graph stacking every layer over a black canvas.
pub fn build_filter_graph(timeline: &CollageTimeline, profile: &OutputProfile) -> String {
    let duration = format!("{:.6}", timeline.duration_secs);
    let mut chains = vec![format!(
        "color=c=black:s={}x{}:r={}:d={duration}[base]",
        timeline.canvas_width, timeline.canvas_height, profile.fps
    )];

    for (input, layer) in timeline.layers().iter().enumerate() {
        chains.push(format!(
            "[{input}:v:{}]trim=duration={duration},setpts=PTS-STARTPTS,{}[layer{input}]",
            layer.track.video_index,
            layer_filter(layer)
        ));
    }

    let mut previous = "base".to_string();
    let last = timeline.layers().len().saturating_sub(1);
    for (input, layer) in timeline.layers().iter().enumerate() {
        let label = if input == last {
            "vout".to_string()
        } else {
            format!("stack{input}")
        };
        let finish = if input == last {
            format!(",format={}", profile.pixel_format)
        } else {
            String::new()
        };
        chains.push(format!(
            "[{previous}][layer{input}]overlay=x={}:y={}:eof_action=pass{finish}[{label}]",
            layer.slot.x.round() as i64,
            layer.slot.y.round() as i64,
        ));
        previous = label;
    }

    chains.join(";")
}

/// Scale the source by its placement transform, then crop to its slot.
pub fn layer_filter(layer: &LayerInstruction) -> String {
    let (natural_w, natural_h) = layer.natural_size;
    let slot_w = layer.slot.width.round().max(1.0);
    let slot_h = layer.slot.height.round().max(1.0);

    let scaled_w = (natural_w as f64 * layer.transform.scale).round().max(slot_w);
    let scaled_h = (natural_h as f64 * layer.transform.scale).round().max(slot_h);

    let crop_x = (layer.slot.x - layer.transform.tx)
        .round()
        .clamp(0.0, scaled_w - slot_w);
    let crop_y = (layer.slot.y - layer.transform.ty)
        .round()
        .clamp(0.0, scaled_h - slot_h);

    format!(
        "scale={}:{}:flags=lanczos,crop={}:{}:{}:{},setsar=1",
        scaled_w as u32, scaled_h as u32, slot_w as u32, slot_h as u32, crop_x as u32, crop_y as u32
    )
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg reports out_time_ms in microseconds as well.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }

    fn fraction(&self, expected_duration_secs: f64) -> f64 {
        if self.complete {
            return 1.0;
        }
        if expected_duration_secs <= 0.0 {
            return 0.0;
        }
        (self.out_time_secs / expected_duration_secs).clamp(0.0, 1.0)
    }
}
