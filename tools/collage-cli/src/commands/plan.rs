//! Show the collage timeline without encoding.

use std::path::PathBuf;

use collage_common::config::AppConfig;
use collage_render_engine::{build_timeline, ingest_for_export, FfprobeProbe};

pub async fn run(config: &AppConfig, paths: Vec<PathBuf>, json: bool) -> anyhow::Result<()> {
    let probe = FfprobeProbe::new(&config.export.ffprobe_binary);
    let sources = ingest_for_export(&probe, &paths).await?;
    let timeline = build_timeline(&sources)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&timeline)?);
        return Ok(());
    }

    println!(
        "Canvas: {}x{} @ {}fps",
        timeline.canvas_width, timeline.canvas_height, timeline.fps
    );
    println!(
        "Duration: {:.3}s ({} frames)",
        timeline.duration_secs,
        timeline.total_frames()
    );
    println!();

    for layer in timeline.layers() {
        let (width, height) = layer.natural_size;
        println!("Slot {}: {}", layer.slot_index, layer.source_path.display());
        println!(
            "  Slot rect: {}x{} at ({}, {})",
            layer.slot.width, layer.slot.height, layer.slot.x, layer.slot.y
        );
        println!("  Natural size: {width}x{height}");
        println!(
            "  Transform: scale {:.4}, translate ({:.2}, {:.2})",
            layer.transform.scale, layer.transform.tx, layer.transform.ty
        );
    }

    Ok(())
}
