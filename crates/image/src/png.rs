//! PNG chunk-stream inspection.
//!
//! Reads the header and ancillary chunks that precede the image data so the
//! scanner can classify a PNG without decoding any pixels.

use crate::{ImageError, Result};
use serde::{Deserialize, Serialize};

const SIGNATURE_LEN: usize = 8;
const CHUNK_OVERHEAD: usize = 12;

/// PNG colour type from the `IHDR` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PngColorType {
    /// 0: greyscale
    Grayscale,
    /// 2: RGB
    Rgb,
    /// 3: palette indices
    Indexed,
    /// 4: greyscale with alpha
    GrayscaleAlpha,
    /// 6: RGB with alpha
    Rgba,
}

impl PngColorType {
    fn from_byte(value: u8) -> Result<Self> {
        match value {
            0 => Ok(PngColorType::Grayscale),
            2 => Ok(PngColorType::Rgb),
            3 => Ok(PngColorType::Indexed),
            4 => Ok(PngColorType::GrayscaleAlpha),
            6 => Ok(PngColorType::Rgba),
            other => Err(ImageError::InvalidData(format!("invalid PNG colour type {}", other))),
        }
    }

    /// Whether every pixel carries an alpha sample.
    pub fn has_alpha_channel(&self) -> bool {
        matches!(self, PngColorType::GrayscaleAlpha | PngColorType::Rgba)
    }
}

/// Header facts about a PNG file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PngInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Bits per sample (1, 2, 4, 8 or 16)
    pub bit_depth: u8,
    /// Colour type
    pub color_type: PngColorType,
    /// Adam7 interlacing
    pub interlaced: bool,
    /// A `tRNS` chunk is present
    pub has_transparency_chunk: bool,
    /// An `iCCP` chunk is present
    pub has_icc_profile: bool,
    /// An `sRGB` chunk is present
    pub has_srgb_chunk: bool,
}

impl PngInfo {
    /// Parse the PNG signature, `IHDR`, and every chunk before the first `IDAT`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if crate::detect_format(data) != crate::ImageFormat::Png {
            return Err(ImageError::UnknownFormat);
        }

        let mut chunks = Chunks { data, offset: SIGNATURE_LEN };
        let (kind, ihdr) = chunks
            .next()
            .ok_or_else(|| ImageError::InvalidData("missing IHDR chunk".into()))??;
        if kind != *b"IHDR" || ihdr.len() < 13 {
            return Err(ImageError::InvalidData("first chunk is not a valid IHDR".into()));
        }

        let mut info = PngInfo {
            width: u32::from_be_bytes([ihdr[0], ihdr[1], ihdr[2], ihdr[3]]),
            height: u32::from_be_bytes([ihdr[4], ihdr[5], ihdr[6], ihdr[7]]),
            bit_depth: ihdr[8],
            color_type: PngColorType::from_byte(ihdr[9])?,
            interlaced: ihdr[12] == 1,
            has_transparency_chunk: false,
            has_icc_profile: false,
            has_srgb_chunk: false,
        };

        for chunk in chunks {
            let (kind, _) = chunk?;
            match &kind {
                b"tRNS" => info.has_transparency_chunk = true,
                b"iCCP" => info.has_icc_profile = true,
                b"sRGB" => info.has_srgb_chunk = true,
                b"IDAT" | b"IEND" => break,
                _ => {}
            }
        }

        Ok(info)
    }

    /// Whether the header allows any pixel to be transparent.
    pub fn declares_alpha(&self) -> bool {
        self.color_type.has_alpha_channel() || self.has_transparency_chunk
    }

    /// Whether samples are wider than JPEG can carry.
    pub fn is_high_bit_depth(&self) -> bool {
        self.bit_depth > 8
    }
}

struct Chunks<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Result<([u8; 4], &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.data.len() {
            return None;
        }
        let data = self.data;
        let rest = &data[self.offset..];
        if rest.len() < CHUNK_OVERHEAD {
            self.offset = self.data.len();
            return Some(Err(ImageError::InvalidData("truncated PNG chunk header".into())));
        }

        let length = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
        let kind = [rest[4], rest[5], rest[6], rest[7]];
        let Some(end) = length.checked_add(CHUNK_OVERHEAD).filter(|end| *end <= rest.len()) else {
            self.offset = self.data.len();
            return Some(Err(ImageError::InvalidData(format!(
                "PNG chunk {} runs past end of file",
                String::from_utf8_lossy(&kind)
            ))));
        };

        self.offset += end;
        Some(Ok((kind, &rest[8..8 + length])))
    }
}
