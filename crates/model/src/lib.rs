//! Collage Data Model
//!
//! Defines the data contracts shared by the compositor:
//! - **Media:** Ingested sources and their primary visual tracks
//! - **Layout:** The fixed slot rectangles and crop-to-fill placement transforms
//! - **Timeline:** The shared output timeline and its composition instruction
//!
//! All geometry is in output pixel space: `(0, 0)` is the top-left corner
//! of the 1080×1920 canvas.

pub mod layout;
pub mod media;
pub mod timeline;

pub use layout::*;
pub use media::*;
pub use timeline::*;
