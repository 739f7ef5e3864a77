//! Exporter error types

use std::path::PathBuf;

use contracts::Modality;
use thiserror::Error;

/// Exporter-specific errors
#[derive(Debug, Error)]
pub enum ExportError {
    /// IO error with the path it happened on
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// PNG encoding error
    #[error("failed to encode {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Payload kind cannot be written for this modality
    #[error("no writer for {modality:?} payload")]
    UnsupportedPayload { modality: Modality },

    /// Archive base directory missing
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExportError {
    /// Wrap an io error with its path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
