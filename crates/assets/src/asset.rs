//! Discovered image files.

use chrono::{DateTime, Utc};
use pngoptim_image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One manifest entry that points at an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetReference {
    /// Manifest file containing the entry
    pub manifest: PathBuf,
    /// The reference exactly as written in the manifest
    pub reference: String,
    /// Extra entry attributes such as `scale` or `idiom`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// An image file found through the project's manifests.
///
/// Assets are never modified in place: conversion writes a new file next to
/// the source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    /// Normalized location on disk
    pub path: PathBuf,
    /// Every manifest entry that resolves to `path`
    pub references: Vec<AssetReference>,
    /// Format detected from the file contents
    pub format: ImageFormat,
    /// File size in bytes
    pub byte_size: u64,
    /// Width in pixels (0 when unknown)
    pub width: u32,
    /// Height in pixels (0 when unknown)
    pub height: u32,
    /// Whether transparency must be preserved
    pub has_alpha: bool,
    /// Bits per sample, for PNG files
    pub bit_depth: Option<u8>,
    /// Whether the file embeds an ICC colour profile
    pub has_color_profile: bool,
    /// When the scanner inspected the file
    pub discovered_at: DateTime<Utc>,
}

impl Asset {
    /// Where the converted JPEG is written: same directory, `.jpg` extension.
    pub fn jpeg_path(&self) -> PathBuf {
        self.path.with_extension("jpg")
    }

    /// Whether samples are wider than 8 bits.
    pub fn is_high_bit_depth(&self) -> bool {
        self.bit_depth.is_some_and(|d| d > 8)
    }

    /// File name for display.
    pub fn display_name(&self) -> String {
        display_name(&self.path)
    }
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Replace the extension of a manifest reference, keeping any directory part.
///
/// ```
/// use pngoptim_assets::asset::with_jpeg_extension;
///
/// assert_eq!(with_jpeg_extension("Images/logo.png"), "Images/logo.jpg");
/// assert_eq!(with_jpeg_extension("Icon@2x.PNG"), "Icon@2x.jpg");
/// assert_eq!(with_jpeg_extension("README"), "README.jpg");
/// ```
pub fn with_jpeg_extension(reference: &str) -> String {
    let name_start = reference.rfind('/').map_or(0, |i| i + 1);
    match reference[name_start..].rfind('.') {
        Some(dot) if dot > 0 => format!("{}.jpg", &reference[..name_start + dot]),
        _ => format!("{}.jpg", reference),
    }
}
