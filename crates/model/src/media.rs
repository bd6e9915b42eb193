//! Ingested source media.
//!
//! A [`SourceMedia`] is produced once per input file by track ingestion
//! and never mutated afterwards.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Handle to the primary video stream of a media container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualTrack {
    /// Index among the container's video streams (`v:N` stream specifier).
    pub video_index: u32,

    /// Absolute stream index inside the container.
    pub stream_index: u32,

    /// Codec name as reported by the demuxer (e.g. "h264", "hevc").
    pub codec: String,

    /// Displayed frame width in pixels, after any container rotation.
    pub width: u32,
    /// Displayed frame height in pixels.
    /// Coded frame height in pixels.
    pub height: u32,
}

/// A source file with its extracted visual track, natural size, and duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMedia {
    /// Local file the media was read from.
    pub path: PathBuf,

    /// Primary visual track.
    pub track: VisualTrack,

    /// Natural frame width in pixels.
    pub natural_width: u32,

    /// Natural frame height in pixels.
    pub natural_height: u32,

    /// Total duration in seconds.
    pub duration_secs: f64,
}

impl SourceMedia {
    /// Build a source whose natural size is taken from its track.
    pub fn new(path: impl Into<PathBuf>, track: VisualTrack, duration_secs: f64) -> Self {
        Self {
            path: path.into(),
            natural_width: track.width,
            natural_height: track.height,
            track,
            duration_secs,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Width divided by height of the natural frame.
    pub fn aspect_ratio(&self) -> f64 {
        self.natural_width as f64 / self.natural_height as f64
    }

    /// Natural frame size as `(width, height)` in pixels.
    pub fn natural_size(&self) -> (f64, f64) {
        (self.natural_width as f64, self.natural_height as f64)
    }
}

/// Shortest duration across a set of sources, or `None` if the set is empty.
pub fn min_duration_secs(sources: &[SourceMedia]) -> Option<f64> {
    sources
        .iter()
        .map(|s| s.duration_secs)
        .min_by(|a, b| a.total_cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(width: u32, height: u32, duration_secs: f64) -> SourceMedia {
        SourceMedia::new(
            format!("/tmp/{width}x{height}.mov"),
            VisualTrack {
                video_index: 0,
                stream_index: 0,
                codec: "h264".to_string(),
                width,
                height,
            },
            duration_secs,
        )
    }

    #[test]
    fn test_natural_size_comes_from_track() {
        let s = source(1920, 1080, 4.0);
        assert_eq!(s.natural_size(), (1920.0, 1080.0));
        assert!((s.aspect_ratio() - 16.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_min_duration_picks_shortest() {
        let sources = vec![source(10, 10, 7.5), source(10, 10, 3.25), source(10, 10, 9.0)];
        assert_eq!(min_duration_secs(&sources), Some(3.25));
        assert_eq!(min_duration_secs(&[]), None);
    }
}
