//! Asset discovery.
//!
//! The scanner walks manifest entries, not the filesystem: only files some
//! manifest refers to are candidates. Items are produced lazily, one file
//! read per call to `next`.

use crate::asset::{Asset, AssetReference};
use crate::error::AssetError;
use crate::manifest::Manifest;
use crate::project::Project;
use chrono::Utc;
use pngoptim_core::Result;
use pngoptim_image::{extract_metadata, Codec};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One scanned location.
#[derive(Debug, Clone)]
pub enum ScanItem {
    Found(Asset),
    /// The referenced file could not be inspected
    Failed {
        path: PathBuf,
        references: Vec<AssetReference>,
        byte_size: u64,
        error: AssetError,
    },
}

impl ScanItem {
    pub fn path(&self) -> &Path {
        match self {
            ScanItem::Found(asset) => &asset.path,
            ScanItem::Failed { path, .. } => path,
        }
    }
}

/// Lazy, single-pass iterator over the assets a set of manifests refers to.
///
/// Each file is yielded once, with every reference that resolves to it.
pub struct AssetScanner {
    pending: std::vec::IntoIter<(PathBuf, Vec<AssetReference>)>,
    alpha_inspector: Option<Arc<dyn Codec>>,
}

impl AssetScanner {
    /// Scan the entries of already loaded manifests.
    pub fn new(manifests: &[Manifest]) -> Self {
        let mut order: Vec<(PathBuf, Vec<AssetReference>)> = Vec::new();
        let mut index: HashMap<PathBuf, usize> = HashMap::new();

        for manifest in manifests {
            for entry in manifest.entries() {
                let reference = AssetReference {
                    manifest: manifest.path().to_path_buf(),
                    reference: entry.reference.clone(),
                    metadata: entry.metadata.clone(),
                };
                match index.get(&entry.location) {
                    Some(&i) => order[i].1.push(reference),
                    None => {
                        index.insert(entry.location.clone(), order.len());
                        order.push((entry.location.clone(), vec![reference]));
                    }
                }
            }
        }

        tracing::debug!(locations = order.len(), "prepared asset scan");
        Self {
            pending: order.into_iter(),
            alpha_inspector: None,
        }
    }

    /// Load the project's manifests and scan them.
    pub fn for_project(project: &Project) -> Result<Self> {
        Ok(Self::new(&project.load_manifests()?))
    }

    /// Decode PNGs whose header declares alpha and only report alpha when a
    /// pixel actually uses it.
    pub fn with_alpha_inspection(mut self, codec: Arc<dyn Codec>) -> Self {
        self.alpha_inspector = Some(codec);
        self
    }

    fn inspect_location(&self, path: PathBuf, references: Vec<AssetReference>) -> ScanItem {
        let failed = |path: PathBuf, references, byte_size, error: AssetError| {
            tracing::warn!(asset = %path.display(), error = %error, "asset could not be scanned");
            ScanItem::Failed {
                path,
                references,
                byte_size,
                error,
            }
        };

        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let error = AssetError::missing(&path);
                return failed(path, references, 0, error);
            }
            Err(e) => return failed(path, references, 0, AssetError::io(&e)),
        };
        let byte_size = data.len() as u64;

        let Some(metadata) = extract_metadata(&data) else {
            let error = AssetError::new(
                crate::error::AssetErrorKind::DecodeFailure,
                "corrupt PNG header",
            );
            return failed(path, references, byte_size, error);
        };

        let mut has_alpha = metadata.declares_alpha();
        if has_alpha {
            if let Some(codec) = &self.alpha_inspector {
                match codec.decode(&data) {
                    Ok(image) => has_alpha = image.uses_alpha(),
                    Err(e) => {
                        tracing::debug!(asset = %path.display(), error = %e, "alpha inspection failed, trusting header");
                    }
                }
            }
        }

        let png = metadata.png.as_ref();
        let asset = Asset {
            references,
            format: metadata.format,
            byte_size,
            width: metadata.width,
            height: metadata.height,
            has_alpha,
            bit_depth: png.map(|p| p.bit_depth),
            has_color_profile: png.is_some_and(|p| p.has_icc_profile),
            discovered_at: Utc::now(),
            path,
        };
        tracing::debug!(
            asset = %asset.path.display(),
            format = %asset.format,
            bytes = asset.byte_size,
            has_alpha = asset.has_alpha,
            "scanned asset"
        );
        ScanItem::Found(asset)
    }
}

impl Iterator for AssetScanner {
    type Item = ScanItem;

    fn next(&mut self) -> Option<Self::Item> {
        let (path, references) = self.pending.next()?;
        Some(self.inspect_location(path, references))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.pending.size_hint()
    }
}

impl ExactSizeIterator for AssetScanner {}
