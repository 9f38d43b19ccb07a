//! Error types for the image crate.

use thiserror::Error;

/// Result type alias for image operations.
pub type Result<T> = std::result::Result<T, ImageError>;

/// Errors that can occur during image operations.
#[derive(Debug, Error)]
pub enum ImageError {
    /// Unknown image format
    #[error("Unknown image format")]
    UnknownFormat,

    /// Invalid image data
    #[error("Invalid image data: {0}")]
    InvalidData(String),

    /// Decoding failed
    #[error("Decode error: {0}")]
    Decode(String),

    /// Encoding failed
    #[error("Encode error: {0}")]
    Encode(String),

    /// Optimizer binary could not be located
    #[error("Optimizer not found: {0}")]
    OptimizerNotFound(String),

    /// Optimizer ran but did not succeed
    #[error("Optimizer failed: {0}")]
    OptimizerFailed(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ImageError {
    /// Whether the error came from reading pixels rather than producing them
    pub fn is_decode(&self) -> bool {
        matches!(self, ImageError::Decode(_) | ImageError::InvalidData(_) | ImageError::UnknownFormat)
    }
}
