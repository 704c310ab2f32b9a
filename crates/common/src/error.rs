//! Error types shared across Formcheck crates.

use std::path::PathBuf;

/// Top-level error type for Formcheck operations.
///
/// Only `ModelLoad` and `Config` are fatal to an analyzer: they surface at
/// construction time. Per-frame variants (`MissingLandmark`, `MissingPose`,
/// `Classifier`) are logged and the frame is skipped, and `Persistence`
/// failures only null out the affected event's frame reference.
#[derive(Debug, thiserror::Error)]
pub enum FormcheckError {
    #[error("Failed to load model '{model}': {message}")]
    ModelLoad { model: String, message: String },

    #[error("Missing landmark: {landmark}")]
    MissingLandmark { landmark: String },

    #[error("No pose detected in frame")]
    MissingPose,

    #[error("Classifier error: {message}")]
    Classifier { message: String },

    #[error("Persistence error: {message}")]
    Persistence { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using FormcheckError.
pub type FormcheckResult<T> = Result<T, FormcheckError>;

impl FormcheckError {
    pub fn model_load(model: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ModelLoad {
            model: model.into(),
            message: msg.into(),
        }
    }

    pub fn missing_landmark(landmark: impl Into<String>) -> Self {
        Self::MissingLandmark {
            landmark: landmark.into(),
        }
    }

    pub fn classifier(msg: impl Into<String>) -> Self {
        Self::Classifier {
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

    /// Whether this error should abort analyzer construction rather than
    /// being recovered per frame.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ModelLoad { .. } | Self::Config { .. })
    }
}
