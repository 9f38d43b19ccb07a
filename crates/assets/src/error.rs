//! Per-asset failures.
//!
//! These never stop a run: they are recorded on the asset's result and the
//! batch moves on. Run-level failures use [`pngoptim_core::Error`].

use pngoptim_image::ImageError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What went wrong with a single asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetErrorKind {
    /// The manifest references a file that does not exist
    MissingAsset,
    /// The source could not be read
    Io,
    /// The source could not be decoded
    DecodeFailure,
    /// JPEG encoding failed
    EncodeFailure,
    /// The optimizer failed
    OptimizeFailure,
    /// The output was empty, too large, or could not be moved into place
    WriteVerificationFailure,
    /// The output name is the source itself, an existing file, or shared with another asset
    OutputConflict,
    /// A manifest referencing the asset could not be saved
    RewriteFailure,
}

impl AssetErrorKind {
    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            AssetErrorKind::MissingAsset => "missing asset",
            AssetErrorKind::Io => "read error",
            AssetErrorKind::DecodeFailure => "decode failure",
            AssetErrorKind::EncodeFailure => "encode failure",
            AssetErrorKind::OptimizeFailure => "optimize failure",
            AssetErrorKind::WriteVerificationFailure => "write verification failure",
            AssetErrorKind::OutputConflict => "output conflict",
            AssetErrorKind::RewriteFailure => "manifest rewrite failure",
        }
    }
}

/// A failure confined to one asset.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{}: {message}", kind.label())]
pub struct AssetError {
    pub kind: AssetErrorKind,
    pub message: String,
}

impl AssetError {
    pub fn new(kind: AssetErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn missing(path: &std::path::Path) -> Self {
        Self::new(
            AssetErrorKind::MissingAsset,
            format!("{} does not exist", path.display()),
        )
    }

    pub fn io(err: &std::io::Error) -> Self {
        Self::new(AssetErrorKind::Io, err.to_string())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(AssetErrorKind::OutputConflict, message)
    }

    pub fn verification(message: impl Into<String>) -> Self {
        Self::new(AssetErrorKind::WriteVerificationFailure, message)
    }

    /// Classify a codec error by the stage that produced it.
    pub fn from_image(err: &ImageError) -> Self {
        let kind = match err {
            ImageError::Decode(_) | ImageError::InvalidData(_) | ImageError::UnknownFormat => {
                AssetErrorKind::DecodeFailure
            }
            ImageError::Encode(_) => AssetErrorKind::EncodeFailure,
            ImageError::OptimizerNotFound(_) | ImageError::OptimizerFailed(_) => {
                AssetErrorKind::OptimizeFailure
            }
            ImageError::IoError(_) => AssetErrorKind::Io,
        };
        Self::new(kind, err.to_string())
    }
}
