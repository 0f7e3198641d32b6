//! Error types for model construction.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModelLoadError>;

#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("Model file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to parse model {}: {reason}", path.display())]
    ParseFailed { path: PathBuf, reason: String },

    #[error("Unknown model architecture: {0}")]
    UnknownArchitecture(String),
}

impl ModelLoadError {
    pub fn parse_failed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ParseFailed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
