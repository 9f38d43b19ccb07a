//! Decode/encode capability.
//!
//! The pipeline talks to [`Codec`] only, so the imaging library behind it
//! can change without touching conversion logic.

use crate::alpha;
use crate::{ImageError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

/// A decoded pixel buffer.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    inner: DynamicImage,
}

impl DecodedImage {
    /// Wrap an already decoded image.
    pub fn new(inner: DynamicImage) -> Self {
        Self { inner }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.inner.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.inner.height()
    }

    /// Whether any pixel is not fully opaque.
    pub fn uses_alpha(&self) -> bool {
        alpha::uses_alpha(&self.inner)
    }

    /// Access the underlying buffer.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.inner
    }
}

/// Image decode and JPEG encode capability.
pub trait Codec: Send + Sync {
    /// Decode encoded image bytes into pixels.
    fn decode(&self, data: &[u8]) -> Result<DecodedImage>;

    /// Encode pixels as a baseline JPEG at `quality` (1-100).
    ///
    /// Any alpha channel is dropped; callers are expected to have rejected
    /// images that need it.
    fn encode_jpeg(&self, image: &DecodedImage, quality: u8) -> Result<Vec<u8>>;
}

/// [`Codec`] backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCodec;

impl Codec for ImageCodec {
    fn decode(&self, data: &[u8]) -> Result<DecodedImage> {
        image::load_from_memory(data)
            .map(DecodedImage::new)
            .map_err(|e| ImageError::Decode(e.to_string()))
    }

    fn encode_jpeg(&self, image: &DecodedImage, quality: u8) -> Result<Vec<u8>> {
        if !(1..=100).contains(&quality) {
            return Err(ImageError::Encode(format!("JPEG quality {} is outside 1-100", quality)));
        }

        let mut buffer = Vec::new();
        {
            let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
            let result = match &image.inner {
                DynamicImage::ImageLuma8(gray) => encoder.encode_image(gray),
                other => encoder.encode_image(&other.to_rgb8()),
            };
            result.map_err(|e| ImageError::Encode(e.to_string()))?;
        }

        if buffer.is_empty() {
            return Err(ImageError::Encode("encoder produced no bytes".into()));
        }
        Ok(buffer)
    }
}
