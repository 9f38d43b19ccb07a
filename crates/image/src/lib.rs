//! Image inspection and transcoding for xcode-png-optim.
//!
//! This crate provides:
//! - Format detection from magic bytes
//! - PNG header inspection (colour type, transparency, colour profiles)
//! - Metadata extraction
//! - Alpha usage checks
//! - The [`Codec`] and [`Optimizer`] capabilities used by the conversion pipeline

#![warn(missing_docs)]

mod detect;
mod error;
mod metadata;
pub mod optimize;
pub mod png;

#[cfg(feature = "processing")]
mod alpha;

#[cfg(feature = "processing")]
pub mod codec;

pub use detect::{detect_format, sniff_file, ImageFormat, SNIFF_LEN};
pub use error::{ImageError, Result};
pub use metadata::{extract_metadata, ImageMetadata};
pub use optimize::{JpegOptim, Optimizer, Passthrough};
pub use png::{PngColorType, PngInfo};

#[cfg(feature = "processing")]
pub use alpha::{has_alpha_channel, uses_alpha};

#[cfg(feature = "processing")]
pub use codec::{Codec, DecodedImage, ImageCodec};
