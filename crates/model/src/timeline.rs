//! The shared output timeline.
//!
//! One [`CollageTimeline`] is assembled per export attempt and is read-only
//! afterwards. It carries a single composition instruction spanning the
//! whole output, with one layer per slot.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::layout::{PlacementTransform, SlotRect, CANVAS_HEIGHT, CANVAS_WIDTH};
use crate::media::VisualTrack;

/// Output frame rate.
pub const FRAME_RATE: u32 = 30;

/// A half-open time range `[start, start + duration)` in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start_secs: f64,
    pub duration_secs: f64,
}

impl TimeRange {
    /// Range starting at zero.
    pub fn from_zero(duration_secs: f64) -> Self {
        Self {
            start_secs: 0.0,
            duration_secs,
        }
    }

    pub fn end_secs(&self) -> f64 {
        self.start_secs + self.duration_secs
    }

    /// Whether `t` falls inside the range.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start_secs && t < self.end_secs()
    }
}

/// One source placed into one slot for the whole clip range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerInstruction {
    /// Slot position, 0 = top.
    pub slot_index: usize,

    /// Target rectangle on the canvas.
    pub slot: SlotRect,

    /// Source file feeding this layer.
    pub source_path: PathBuf,

    /// Visual track read from the source.
    pub track: VisualTrack,

    /// Natural frame size of the source `(width, height)`.
    pub natural_size: (u32, u32),

    /// Portion of the source inserted into the timeline.
    pub clip: TimeRange,

    /// Constant transform, effective from time zero.
    pub transform: PlacementTransform,
}

/// A single instruction covering `time_range`, stacking all layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionInstruction {
    pub time_range: TimeRange,
    pub layers: Vec<LayerInstruction>,
}

/// The output timeline: canvas, frame rate, duration, and instructions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollageTimeline {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub fps: u32,
    pub duration_secs: f64,
    pub instruction: CompositionInstruction,
}

impl CollageTimeline {
    /// Timeline on the fixed 1080×1920 @ 30fps canvas.
    pub fn new(duration_secs: f64, layers: Vec<LayerInstruction>) -> Self {
        Self {
            canvas_width: CANVAS_WIDTH,
            canvas_height: CANVAS_HEIGHT,
            fps: FRAME_RATE,
            duration_secs,
            instruction: CompositionInstruction {
                time_range: TimeRange::from_zero(duration_secs),
                layers,
            },
        }
    }

    pub fn layers(&self) -> &[LayerInstruction] {
        &self.instruction.layers
    }

    /// Duration of one output frame.
    pub fn frame_duration_secs(&self) -> f64 {
        1.0 / self.fps.max(1) as f64
    }

    /// Number of frames the export will produce.
    pub fn total_frames(&self) -> u64 {
        (self.duration_secs * self.fps as f64).ceil() as u64
    }
}

/// Lifecycle of one export attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportStatus {
    /// Nothing requested yet.
    Idle,
    /// Timeline assembly in progress.
    Building,
    /// Encoder running.
    Exporting,
    /// Output file fully written.
    Succeeded,
    /// Aborted by an error.
    Failed,
    /// Aborted by the host.
    Cancelled,
}

impl ExportStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Building => "building",
            Self::Exporting => "exporting",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range_is_half_open() {
        let range = TimeRange::from_zero(2.5);
        assert!(range.contains(0.0));
        assert!(range.contains(2.499));
        assert!(!range.contains(2.5));
        assert_eq!(range.end_secs(), 2.5);
    }

    #[test]
    fn test_timeline_uses_fixed_canvas() {
        let timeline = CollageTimeline::new(4.0, Vec::new());
        assert_eq!(timeline.canvas_width, 1080);
        assert_eq!(timeline.canvas_height, 1920);
        assert_eq!(timeline.fps, 30);
        assert_eq!(timeline.instruction.time_range, TimeRange::from_zero(4.0));
    }

    #[test]
    fn test_total_frames_rounds_up() {
        assert_eq!(CollageTimeline::new(1.0, Vec::new()).total_frames(), 30);
        assert_eq!(CollageTimeline::new(1.01, Vec::new()).total_frames(), 31);
        let frame = CollageTimeline::new(1.0, Vec::new()).frame_duration_secs();
        assert!((frame - 1.0 / 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!ExportStatus::Idle.is_terminal());
        assert!(!ExportStatus::Building.is_terminal());
        assert!(!ExportStatus::Exporting.is_terminal());
        assert!(ExportStatus::Succeeded.is_terminal());
        assert!(ExportStatus::Failed.is_terminal());
        assert!(ExportStatus::Cancelled.is_terminal());
    }
}
