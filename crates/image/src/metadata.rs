//! Image metadata extraction.

use crate::png::PngInfo;
use crate::{detect_format, ImageFormat};
use serde::{Deserialize, Serialize};

/// Image metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Image width in pixels (0 when unknown)
    pub width: u32,
    /// Image height in pixels (0 when unknown)
    pub height: u32,
    /// Detected format
    pub format: ImageFormat,
    /// File size in bytes
    pub size_bytes: u64,
    /// Header details for PNG files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub png: Option<PngInfo>,
}

impl ImageMetadata {
    /// Whether the file format allows transparent pixels according to its header.
    pub fn declares_alpha(&self) -> bool {
        self.png.as_ref().is_some_and(PngInfo::declares_alpha)
    }
}

/// Extract metadata from image data.
///
/// Returns `None` for PNG data with a corrupt header; other formats always
/// produce metadata, with zero dimensions when they cannot be read.
pub fn extract_metadata(data: &[u8]) -> Option<ImageMetadata> {
    let format = detect_format(data);

    let (width, height, png) = match format {
        ImageFormat::Png => {
            let info = PngInfo::parse(data).ok()?;
            (info.width, info.height, Some(info))
        }
        ImageFormat::Jpeg => {
            let (w, h) = extract_jpeg_dimensions(data).unwrap_or((0, 0));
            (w, h, None)
        }
        ImageFormat::Gif => {
            let (w, h) = extract_gif_dimensions(data).unwrap_or((0, 0));
            (w, h, None)
        }
        _ => (0, 0, None),
    };

    Some(ImageMetadata {
        width,
        height,
        format,
        size_bytes: data.len() as u64,
        png,
    })
}

/// Extract dimensions from JPEG data.
fn extract_jpeg_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    // Skip SOI marker
    let mut i = 2;

    while i + 4 < data.len() {
        if data[i] != 0xFF {
            i += 1;
            continue;
        }

        let marker = data[i + 1];

        // SOF markers carry the frame size
        if matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF) {
            if i + 8 < data.len() {
                let height = u16::from_be_bytes([data[i + 5], data[i + 6]]) as u32;
                let width = u16::from_be_bytes([data[i + 7], data[i + 8]]) as u32;
                return Some((width, height));
            }
            return None;
        }

        if marker == 0xD8 || marker == 0xD9 || marker == 0xFF || (0xD0..=0xD7).contains(&marker) {
            i += if marker == 0xFF { 1 } else { 2 };
        } else {
            let length = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
            i += 2 + length;
        }
    }

    None
}

/// Extract dimensions from GIF data.
fn extract_gif_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    if data.len() < 10 {
        return None;
    }

    let width = u16::from_le_bytes([data[6], data[7]]) as u32;
    let height = u16::from_le_bytes([data[8], data[9]]) as u32;

    Some((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::png::tests::png_with_chunks;

    #[test]
    fn test_png_metadata() {
        let data = png_with_chunks(6, 8, &[]);
        let meta = extract_metadata(&data).unwrap();
        assert_eq!(meta.format, ImageFormat::Png);
        assert_eq!((meta.width, meta.height), (64, 32));
        assert!(meta.declares_alpha());
        assert_eq!(meta.size_bytes, data.len() as u64);
    }

    #[test]
    fn test_jpeg_dimensions() {
        // SOI, APP0 (length 4), SOF0 with 8-bit precision, 40 high, 30 wide
        let data = [
            0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00, 0xFF, 0xC0, 0x00, 0x11, 0x08, 0x00,
            0x28, 0x00, 0x1E, 0x03,
        ];
        let meta = extract_metadata(&data).unwrap();
        assert_eq!(meta.format, ImageFormat::Jpeg);
        assert_eq!((meta.width, meta.height), (30, 40));
        assert!(!meta.declares_alpha());
    }

    #[test]
    fn test_unknown_format_still_has_size() {
        let meta = extract_metadata(b"not an image at all").unwrap();
        assert_eq!(meta.format, ImageFormat::Other);
        assert_eq!(meta.size_bytes, 19);
    }

    #[test]
    fn test_corrupt_png_has_no_metadata() {
        let data = png_with_chunks(2, 8, &[]);
        assert!(extract_metadata(&data[..16]).is_none());
    }
}
