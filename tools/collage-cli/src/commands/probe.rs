//! Report the ingestion outcome of each file.

use std::path::PathBuf;

use collage_common::config::AppConfig;
use collage_render_engine::{ingest_sources, FfprobeProbe};

pub async fn run(config: &AppConfig, paths: Vec<PathBuf>) -> anyhow::Result<()> {
    let probe = FfprobeProbe::new(&config.export.ffprobe_binary);
    let outcomes = ingest_sources(&probe, &paths).await;

    let mut rejected = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(source) => println!(
                "[OK]   {}: {} {}x{}, {:.2}s (aspect {:.3})",
                outcome.path.display(),
                source.track.codec,
                source.natural_width,
                source.natural_height,
                source.duration_secs,
                source.aspect_ratio()
            ),
            Err(failure) => {
                rejected += 1;
                println!("[FAIL] {}: {failure}", outcome.path.display());
            }
        }
    }

    println!();
    println!(
        "{} of {} file(s) usable",
        outcomes.len() - rejected,
        outcomes.len()
    );
    Ok(())
}
