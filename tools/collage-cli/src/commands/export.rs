//! Export a collage and save it to the library.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use collage_common::config::AppConfig;
use collage_render_engine::{
    ingest_for_export, ExportSettings, Exporter, FfmpegEncoder, FfprobeProbe, LibraryDir,
};

pub async fn run(config: &AppConfig, paths: Vec<PathBuf>) -> anyhow::Result<()> {
    let probe = FfprobeProbe::new(&config.export.ffprobe_binary);
    let sources = ingest_for_export(&probe, &paths)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load videos: {e}"))?;

    let settings = ExportSettings::from_defaults(&config.export);
    println!("Exporting collage");
    for (slot, source) in ["Top", "Middle", "Bottom"].iter().zip(&sources) {
        println!(
            "  {slot}: {} ({}x{}, {:.1}s)",
            source.path.display(),
            source.natural_width,
            source.natural_height,
            source.duration_secs
        );
    }
    println!("  Temp file: {}", settings.temp_path.display());
    println!("  Library: {}", config.library_dir.display());

    let exporter = Exporter::new(
        Arc::new(FfmpegEncoder::new(&config.export.ffmpeg_binary)),
        Arc::new(LibraryDir::new(&config.library_dir)),
        settings,
    );
    let handle = exporter.start(sources)?;

    let mut progress = handle.subscribe_progress();
    let printer = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let value = *progress.borrow_and_update();
            print!("\r  Progress: {:.1}%  ", value * 100.0);
            let _ = std::io::stdout().flush();
        }
    });

    let canceller = handle.canceller();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, cancelling export");
            canceller.cancel();
        }
    });

    let result = handle.wait().await;
    interrupt.abort();
    let _ = printer.await;

    match result {
        Ok(outcome) => {
            println!(
                "\nExport complete: {} ({:.2}s, {} frames)",
                outcome.saved_path.display(),
                outcome.duration_secs,
                outcome.total_frames
            );
            Ok(())
        }
        Err(e) if e.is_cancelled() => {
            println!("\nExport cancelled");
            Ok(())
        }
        Err(e) => {
            println!();
            Err(anyhow::anyhow!(e))
        }
    }
}
