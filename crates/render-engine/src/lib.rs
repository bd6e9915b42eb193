//! Collage Render Engine
//!
//! Offline pipeline that composites three source videos into one
//! vertically stacked collage and exports it.
//!
//! # Pipeline Architecture
//!
//! ```text
//! top.mov ────┐
//!             ├── Ingest (ffprobe: visual track, size, duration)
//! middle.mov ─┤          │
//!             │          ├── Layout (crop-to-fill transform per slot)
//! bottom.mov ─┘          │
//!                        ├── Timeline (clip to shortest source)
//!                        │
//!                        ▼
//!                 Encode (ffmpeg, H.264) ── progress sampler (~10 Hz)
//!                        │
//!                        ▼
//!              collaged_video.mov (temp)
//!                        │
//!                        ▼
//!                 Persist (library) ── temp file removed
//! ```

pub mod compositor;
pub mod encoder;
pub mod export;
pub mod ingest;
pub mod persist;

pub use compositor::build_timeline;
pub use encoder::{Encoder, FfmpegEncoder, OutputProfile, ProgressCell};
pub use export::*;
pub use ingest::{
    ingest_for_export, ingest_source, ingest_sources, FfprobeProbe, IngestOutcome, MediaInfo,
    MediaProbe,
};
pub use persist::{LibraryDir, Persistence};
