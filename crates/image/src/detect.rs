//! Image format detection from magic bytes.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Bytes needed to recognise every supported signature.
pub const SNIFF_LEN: usize = 16;

const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Image formats the scanner can tell apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG image
    Png,
    /// JPEG image
    Jpeg,
    /// GIF image
    Gif,
    /// WebP image
    WebP,
    /// HEIC/HEIF image
    Heic,
    /// PDF vector asset (common in asset catalogs)
    Pdf,
    /// Anything else
    Other,
}

impl ImageFormat {
    /// Get the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Heic => "image/heic",
            ImageFormat::Pdf => "application/pdf",
            ImageFormat::Other => "application/octet-stream",
        }
    }

    /// Extension written for files produced in this format.
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            ImageFormat::Png => Some("png"),
            ImageFormat::Jpeg => Some("jpg"),
            ImageFormat::Gif => Some("gif"),
            ImageFormat::WebP => Some("webp"),
            ImageFormat::Heic => Some("heic"),
            ImageFormat::Pdf => Some("pdf"),
            ImageFormat::Other => None,
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ImageFormat::Png => "PNG",
            ImageFormat::Jpeg => "JPEG",
            ImageFormat::Gif => "GIF",
            ImageFormat::WebP => "WebP",
            ImageFormat::Heic => "HEIC",
            ImageFormat::Pdf => "PDF",
            ImageFormat::Other => "other",
        };
        f.write_str(name)
    }
}

/// Detect image format from the leading bytes of a file.
///
/// Classification never looks at the file name, so a JPEG saved as
/// `icon.png` is reported as [`ImageFormat::Jpeg`].
///
/// # Example
/// ```
/// use pngoptim_image::{detect_format, ImageFormat};
///
/// let jpeg_data = [0xFF, 0xD8, 0xFF, 0xE0];
/// assert_eq!(detect_format(&jpeg_data), ImageFormat::Jpeg);
///
/// let png_data = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
/// assert_eq!(detect_format(&png_data), ImageFormat::Png);
///
/// assert_eq!(detect_format(b"hello"), ImageFormat::Other);
/// ```
pub fn detect_format(data: &[u8]) -> ImageFormat {
    if data.starts_with(&PNG_SIGNATURE) {
        return ImageFormat::Png;
    }

    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return ImageFormat::Jpeg;
    }

    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return ImageFormat::Gif;
    }

    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return ImageFormat::WebP;
    }

    if data.starts_with(b"%PDF-") {
        return ImageFormat::Pdf;
    }

    if data.len() >= 12 && &data[4..8] == b"ftyp" {
        let brand = &data[8..12];
        if matches!(brand, b"heic" | b"heix" | b"mif1" | b"msf1") {
            return ImageFormat::Heic;
        }
    }

    ImageFormat::Other
}

/// Read the first [`SNIFF_LEN`] bytes of a file and classify them.
pub fn sniff_file(path: &Path) -> std::io::Result<ImageFormat> {
    let mut head = Vec::with_capacity(SNIFF_LEN);
    File::open(path)?
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut head)?;
    Ok(detect_format(&head))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_jpeg() {
        let data = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46];
        assert_eq!(detect_format(&data), ImageFormat::Jpeg);
    }

    #[test]
    fn test_detect_png() {
        let data = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00];
        assert_eq!(detect_format(&data), ImageFormat::Png);
    }

    #[test]
    fn test_truncated_png_signature_is_other() {
        let data = [0x89, 0x50, 0x4E, 0x47];
        assert_eq!(detect_format(&data), ImageFormat::Other);
    }

    #[test]
    fn test_detect_webp_and_pdf() {
        assert_eq!(detect_format(b"RIFF\x00\x00\x00\x00WEBP"), ImageFormat::WebP);
        assert_eq!(detect_format(b"%PDF-1.4\n"), ImageFormat::Pdf);
    }

    #[test]
    fn test_empty_is_other() {
        assert_eq!(detect_format(&[]), ImageFormat::Other);
    }

    #[test]
    fn test_sniff_ignores_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("renamed.png");
        std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xDB, 0x00]).unwrap();
        assert_eq!(sniff_file(&path).unwrap(), ImageFormat::Jpeg);
    }
}
