//! Error types for framewise-track

use thiserror::Error;

/// Failure to resolve one image reference to a local file.
#[derive(Error, Debug)]
pub enum MaterializeError {
    #[error("failed to download {reference}: {cause}")]
    DownloadFailed { reference: String, cause: String },

    #[error("failed to decode inline image {reference}")]
    DecodeFailed { reference: String },

    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum TrackError {
    #[error("image preparation failed: {0}")]
    Materialize(#[from] MaterializeError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("tracker error: {0}")]
    Tracker(String),

    #[error("worker error: {0}")]
    Worker(String),

    #[error("overlay error: {0}")]
    Overlay(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Core error: {0}")]
    Core(#[from] framewise_core::Error),
}

impl From<image::ImageError> for TrackError {
    fn from(err: image::ImageError) -> Self {
        TrackError::Overlay(err.to_string())
    }
}
