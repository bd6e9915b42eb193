//! Persistence of finished exports.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Local};

use collage_common::error::{CollageError, CollageResult};

/// Durable destination for a finished export file.
///
/// The caller owns the input file and removes it afterwards, so
/// implementations must copy rather than move it.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Destination name.
    fn name(&self) -> &str;

    /// Save `file` and return where it ended up.
    async fn persist(&self, file: &Path) -> CollageResult<PathBuf>;
}

/// A plain directory acting as the media library.
#[derive(Debug, Clone)]
pub struct LibraryDir {
    root: PathBuf,
}

impl LibraryDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// First free `collage_<timestamp>[_n].<ext>` path in the library.
    fn target_for(&self, file: &Path, now: DateTime<Local>) -> PathBuf {
        let ext = file
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mov");
        let stem = format!("collage_{}", now.format("%Y%m%d_%H%M%S"));

        let mut candidate = self.root.join(format!("{stem}.{ext}"));
        let mut n = 1;
        while candidate.exists() {
            candidate = self.root.join(format!("{stem}_{n}.{ext}"));
            n += 1;
        }
        candidate
    }
}

#[async_trait]
impl Persistence for LibraryDir {
    fn name(&self) -> &str {
        "library"
    }

    async fn persist(&self, file: &Path) -> CollageResult<PathBuf> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            CollageError::persistence(format!(
                "Failed to create library {}: {e}",
                self.root.display()
            ))
        })?;

        let target = self.target_for(file, Local::now());
        tokio::fs::copy(file, &target).await.map_err(|e| {
            CollageError::persistence(format!(
                "Failed to copy {} to {}: {e}",
                file.display(),
                target.display()
            ))
        })?;

        tracing::info!(path = %target.display(), "Export saved to library");
        Ok(target)
    }
}
