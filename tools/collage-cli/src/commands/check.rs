//! Check encoder tools and configuration.

use collage_common::config::{config_file_path, AppConfig};
use collage_render_engine::{Encoder, FfmpegEncoder, FfprobeProbe};

pub fn run(config: &AppConfig, init_config: bool) -> anyhow::Result<()> {
    println!("Collage System Check");
    println!("{}", "=".repeat(50));

    let encoder = FfmpegEncoder::new(&config.export.ffmpeg_binary);
    let encoder_ok = encoder.is_available();
    if encoder_ok {
        println!("[OK] Encoder: {}", config.export.ffmpeg_binary);
    } else {
        println!("[MISSING] Encoder: {}", config.export.ffmpeg_binary);
    }

    let probe = FfprobeProbe::new(&config.export.ffprobe_binary);
    let probe_ok = probe.is_available();
    if probe_ok {
        println!("[OK] Probe: {}", config.export.ffprobe_binary);
    } else {
        println!("[MISSING] Probe: {}", config.export.ffprobe_binary);
    }

    println!();
    let config_path = config_file_path();
    if config_path.exists() {
        println!("Config: {}", config_path.display());
    } else if init_config {
        config.save()?;
        println!("Config: {} (created)", config_path.display());
    } else {
        println!("Config: {} (not found, using defaults)", config_path.display());
    }
    println!("Library: {}", config.library_dir.display());
    println!("Temp file: {}", config.export.temp_path().display());

    println!();
    if encoder_ok && probe_ok {
        println!("ffmpeg and ffprobe are available. Collage is ready.");
    } else {
        println!("Install ffmpeg (which provides ffprobe) or set the binaries in the config.");
    }

    Ok(())
}
