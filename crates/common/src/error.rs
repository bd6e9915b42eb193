//! Error types shared across Collage crates.

use std::path::PathBuf;

/// Why a single source could not be ingested.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestionFailure {
    #[error("no visual track present")]
    NoVisualTrack,

    #[error("unreadable source: {0}")]
    UnreadableSource(String),

    #[error("source has zero duration")]
    ZeroDuration,
}

/// Top-level error type for Collage operations.
#[derive(Debug, thiserror::Error)]
pub enum CollageError {
    #[error("Precondition violation: {message}")]
    PreconditionViolation { message: String },

    #[error("Ingestion failed for {path}: {failure}")]
    Ingestion {
        path: PathBuf,
        failure: IngestionFailure,
    },

    #[error("Composition build failed: {message}")]
    CompositionBuild { message: String },

    #[error("Failed to create export session: {message}")]
    ExportSessionCreation { message: String },

    #[error("Export failed: {message}")]
    Export { message: String },

    #[error("Export cancelled")]
    ExportCancelled,

    #[error("An export is already in progress")]
    ExportBusy,

    #[error("Failed to save export: {message}")]
    Persistence { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using CollageError.
pub type CollageResult<T> = Result<T, CollageError>;

impl CollageError {
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::PreconditionViolation {
            message: msg.into(),
        }
    }

    pub fn ingestion(path: impl Into<PathBuf>, failure: IngestionFailure) -> Self {
        Self::Ingestion {
            path: path.into(),
            failure,
        }
    }

    pub fn composition(msg: impl Into<String>) -> Self {
        Self::CompositionBuild {
            message: msg.into(),
        }
    }

    pub fn session(msg: impl Into<String>) -> Self {
        Self::ExportSessionCreation {
            message: msg.into(),
        }
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export {
            message: msg.into(),
        }
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether this error ends an attempt as cancelled rather than failed.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::ExportCancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_message_is_preserved() {
        let err = CollageError::export("encoder exploded: invalid frame size");
        assert_eq!(
            err.to_string(),
            "Export failed: encoder exploded: invalid frame size"
        );
    }

    #[test]
    fn test_ingestion_error_names_path_and_failure() {
        let err = CollageError::ingestion("/videos/a.mov", IngestionFailure::NoVisualTrack);
        let msg = err.to_string();
        assert!(msg.contains("/videos/a.mov"));
        assert!(msg.contains("no visual track"));
    }

    #[test]
    fn test_cancelled_classification() {
        assert!(CollageError::ExportCancelled.is_cancelled());
        assert!(!CollageError::export("x").is_cancelled());
    }
}
