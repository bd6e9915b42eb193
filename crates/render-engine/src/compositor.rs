//! Timeline assembly: combines three ingested sources into one collage timeline.
//!
//! Every source is clipped to the shortest source duration and placed into
//! its slot with a constant crop-to-fill transform effective from time zero.

use collage_common::error::{CollageError, CollageResult};
use collage_model::{
    min_duration_secs, plan_placement, CollageTimeline, LayerInstruction, SlotRect, SourceMedia,
    TimeRange, COLLAGE_SLOTS, SLOT_COUNT,
};

/// Assemble the collage timeline. Sources map to slots top to bottom.
pub fn build_timeline(sources: &[SourceMedia]) -> CollageResult<CollageTimeline> {
    if sources.len() != SLOT_COUNT {
        return Err(CollageError::precondition(format!(
            "exactly {SLOT_COUNT} sources are required, got {}",
            sources.len()
        )));
    }

    let min_duration = min_duration_secs(sources)
        .ok_or_else(|| CollageError::composition("no sources to compose"))?;
    if !min_duration.is_finite() || min_duration <= 0.0 {
        return Err(CollageError::composition(format!(
            "shortest source duration must be positive, got {min_duration}"
        )));
    }

    let clip = TimeRange::from_zero(min_duration);
    let mut layers = Vec::with_capacity(SLOT_COUNT);
    for (slot_index, (source, slot)) in sources.iter().zip(COLLAGE_SLOTS.iter()).enumerate() {
        layers.push(insert_layer(slot_index, source, slot, clip)?);
    }

    tracing::info!(
        duration_secs = min_duration,
        layers = layers.len(),
        "Collage timeline built"
    );

    Ok(CollageTimeline::new(min_duration, layers))
}

/// Insert one source's clip into its slot.
fn insert_layer(
    slot_index: usize,
    source: &SourceMedia,
    slot: &SlotRect,
    clip: TimeRange,
) -> CollageResult<LayerInstruction> {
    if source.natural_width == 0 || source.natural_height == 0 {
        return Err(CollageError::composition(format!(
            "{} has an empty frame ({}x{})",
            source.path.display(),
            source.natural_width,
            source.natural_height
        )));
    }
    if clip.end_secs() > source.duration_secs {
        return Err(CollageError::composition(format!(
            "clip [0, {:.3}) exceeds {} duration {:.3}s",
            clip.end_secs(),
            source.path.display(),
            source.duration_secs
        )));
    }

    let (width, height) = source.natural_size();
    let transform = plan_placement(width, height, slot);

    tracing::debug!(
        slot = slot_index,
        source = %source.path.display(),
        scale = transform.scale,
        tx = transform.tx,
        ty = transform.ty,
        "Layer placed"
    );

    Ok(LayerInstruction {
        slot_index,
        slot: *slot,
        source_path: source.path.clone(),
        track: source.track.clone(),
        natural_size: (source.natural_width, source.natural_height),
        clip,
        transform,
    })
}
