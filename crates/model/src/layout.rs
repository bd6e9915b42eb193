//! Slot layout and crop-to-fill placement.
//!
//! The canvas is split into three equal horizontal bands. Each source is
//! scaled uniformly until it covers its band on both axes, centered, and
//! the overflow on the longer axis is cropped. There is no letterbox mode.

use serde::{Deserialize, Serialize};

/// Output canvas width in pixels.
pub const CANVAS_WIDTH: u32 = 1080;

/// Output canvas height in pixels.
pub const CANVAS_HEIGHT: u32 = 1920;

/// Number of slots in the collage.
pub const SLOT_COUNT: usize = 3;

/// Height of one band.
const BAND_HEIGHT: f64 = CANVAS_HEIGHT as f64 / SLOT_COUNT as f64;

/// The three bands, top to bottom.
pub const COLLAGE_SLOTS: [SlotRect; SLOT_COUNT] = [
    SlotRect::new(0.0, 0.0, CANVAS_WIDTH as f64, BAND_HEIGHT),
    SlotRect::new(0.0, BAND_HEIGHT, CANVAS_WIDTH as f64, BAND_HEIGHT),
    SlotRect::new(0.0, 2.0 * BAND_HEIGHT, CANVAS_WIDTH as f64, BAND_HEIGHT),
];

/// A target rectangle in output pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlotRect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl SlotRect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Width divided by height.
    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Whether `other` lies entirely inside this rectangle, within `eps`.
    pub fn contains_rect(&self, other: &SlotRect, eps: f64) -> bool {
        other.x >= self.x - eps
            && other.y >= self.y - eps
            && other.right() <= self.right() + eps
            && other.bottom() <= self.bottom() + eps
    }

    /// Whether the two rectangles share any interior area.
    pub fn overlaps(&self, other: &SlotRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Uniform scale followed by a translation, in output pixel space.
///
/// A source pixel `(x, y)` lands at `(x * scale + tx, y * scale + ty)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementTransform {
    pub scale: f64,
    pub tx: f64,
    pub ty: f64,
}

impl PlacementTransform {
    pub const IDENTITY: PlacementTransform = PlacementTransform {
        scale: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    /// Map a source-space point into canvas space.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.scale + self.tx, y * self.scale + self.ty)
    }

    /// Bounding box of a `width`×`height` source frame after the transform.
    pub fn map_frame(&self, width: f64, height: f64) -> SlotRect {
        SlotRect::new(self.tx, self.ty, width * self.scale, height * self.scale)
    }

    /// Affine matrix in `[a, b, c, d, tx, ty]` row form.
    pub fn to_matrix(&self) -> [f64; 6] {
        [self.scale, 0.0, 0.0, self.scale, self.tx, self.ty]
    }
}

impl Default for PlacementTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Compute the crop-to-fill transform placing a `width`×`height` frame into `slot`.
///
/// A source wider than the slot fits its height and is cropped left/right;
/// otherwise it fits its width and is cropped top/bottom. Equal aspect
/// ratios take the width-fit branch, which has no overflow to crop.
pub fn plan_placement(width: f64, height: f64, slot: &SlotRect) -> PlacementTransform {
    let source_aspect = width / height;
    let target_aspect = slot.aspect_ratio();

    let (scale, offset_x, offset_y) = if source_aspect > target_aspect {
        let scale = slot.height / height;
        let overflow = width * scale - slot.width;
        (scale, -overflow / 2.0, 0.0)
    } else {
        let scale = slot.width / width;
        let overflow = height * scale - slot.height;
        (scale, 0.0, -overflow / 2.0)
    };

    PlacementTransform {
        scale,
        tx: offset_x + slot.x,
        ty: offset_y + slot.y,
    }
}

/// Plan all three slots for the given natural sizes, top slot first.
pub fn plan_layout(sizes: [(f64, f64); SLOT_COUNT]) -> [PlacementTransform; SLOT_COUNT] {
    let mut transforms = [PlacementTransform::IDENTITY; SLOT_COUNT];
    for (i, (w, h)) in sizes.into_iter().enumerate() {
        transforms[i] = plan_placement(w, h, &COLLAGE_SLOTS[i]);
    }
    transforms
}
