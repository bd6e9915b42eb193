//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CollageError, CollageResult};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory finished collages are saved into.
    pub library_dir: PathBuf,

    /// Export pipeline settings.
    pub export: ExportDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Export pipeline parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportDefaults {
    /// Directory holding the temporary export file.
    pub temp_dir: PathBuf,

    /// File name of the temporary export inside `temp_dir`.
    pub temp_file_name: String,

    /// How often export progress is sampled (milliseconds).
    pub progress_interval_ms: u64,

    /// ffmpeg executable used for encoding.
    pub ffmpeg_binary: String,

    /// ffprobe executable used for ingestion.
    pub ffprobe_binary: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "collage=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            library_dir: default_library_dir(),
            export: ExportDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir(),
            temp_file_name: "collaged_video.mov".to_string(),
            progress_interval_ms: 100,
            ffmpeg_binary: "ffmpeg".to_string(),
            ffprobe_binary: "ffprobe".to_string(),
        }
    }
}

impl ExportDefaults {
    /// Full path of the temporary export file.
    ///
    /// The process id is appended to the file stem so that separate
    /// processes never write the same file.
    pub fn temp_path(&self) -> PathBuf {
        let name = Path::new(&self.temp_file_name);
        let stem = name
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("collaged_video");
        let pid = std::process::id();
        let file = match name.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{stem}-{pid}.{ext}"),
            None => format!("{stem}-{pid}"),
        };
        self.temp_dir.join(file)
    }

    /// Progress sampling period, never shorter than 1ms.
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(1))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location.
    pub fn load() -> CollageResult<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path. A missing file yields defaults.
    pub fn load_from(config_path: &Path) -> CollageResult<Self> {
        let content = match std::fs::read_to_string(config_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(CollageError::config(format!(
                    "Failed to read {}: {e}",
                    config_path.display()
                )))
            }
        };
        serde_json::from_str(&content).map_err(|e| {
            CollageError::config(format!("Failed to parse {}: {e}", config_path.display()))
        })
    }

    /// Save config to the standard location.
    pub fn save(&self) -> CollageResult<()> {
        self.save_to(&config_file_path())
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, config_path: &Path) -> CollageResult<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, json)?;
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("collage").join("config.json")
}

/// Default library directory.
fn default_library_dir() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("collage").join("library")
}
