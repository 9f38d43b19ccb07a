//! Project manifests: the files that tell the build which assets exist.
//!
//! Three dialects are understood, chosen by file name:
//!
//! - `*.xcodeproj/project.pbxproj`, references resolve against the directory
//!   containing the `.xcodeproj` bundle
//! - `*.imageset/Contents.json`, references resolve against the image set
//! - anything else is a plain list, one path per line relative to the project root

mod catalog;
mod list;
mod pbxproj;

use crate::fs::{normalize, write_atomic};
use catalog::ImageSet;
use list::ListFile;
use pbxproj::PbxprojFile;
use pngoptim_core::{Error, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// File name of the list manifest picked up from the project root
pub const LIST_MANIFEST_NAME: &str = "assets.manifest";

/// Manifest dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestKind {
    XcodeProject,
    AssetCatalog,
    List,
}

impl ManifestKind {
    /// Pick the dialect for a manifest file path.
    pub fn for_path(path: &Path) -> Self {
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        let parent_ext = path
            .parent()
            .and_then(|p| p.extension())
            .and_then(|e| e.to_str())
            .unwrap_or("");

        match (file_name, parent_ext) {
            ("project.pbxproj", "xcodeproj") => ManifestKind::XcodeProject,
            ("Contents.json", "imageset") => ManifestKind::AssetCatalog,
            _ => ManifestKind::List,
        }
    }
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestKind::XcodeProject => write!(f, "Xcode project"),
            ManifestKind::AssetCatalog => write!(f, "asset catalog"),
            ManifestKind::List => write!(f, "list"),
        }
    }
}

/// One asset reference inside a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Stable handle for rewriting: object id, image index or line number
    pub key: String,
    /// The path as written in the manifest
    pub reference: String,
    /// Where the reference resolves on disk
    pub location: PathBuf,
    /// Dialect-specific attributes (`scale`, `idiom`, `name`, ...)
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
enum Document {
    Pbxproj(PbxprojFile),
    Catalog(ImageSet),
    List(ListFile),
}

/// A manifest loaded from disk.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    base_dir: PathBuf,
    kind: ManifestKind,
    document: Document,
    entries: Vec<ManifestEntry>,
    modified: bool,
}

impl Manifest {
    /// Load a manifest.
    ///
    /// `path` may also be an `.xcodeproj` bundle, in which case its
    /// `project.pbxproj` is loaded.
    pub fn open(path: &Path, project_root: &Path) -> Result<Self> {
        let path = resolve_manifest_path(path);
        if !path.is_file() {
            return Err(Error::file_not_found(&path).with_context("While loading manifest"));
        }
        let kind = ManifestKind::for_path(&path);
        let text = std::fs::read_to_string(&path)
            .map_err(Error::from)
            .context(format!("While reading manifest {}", path.display()))?;

        let parent = path.parent().unwrap_or(Path::new("."));
        let (base_dir, document) = match kind {
            ManifestKind::XcodeProject => (
                parent.parent().unwrap_or(Path::new(".")).to_path_buf(),
                Document::Pbxproj(PbxprojFile::parse(&path, text)?),
            ),
            ManifestKind::AssetCatalog => (
                parent.to_path_buf(),
                Document::Catalog(ImageSet::parse(&path, &text)?),
            ),
            ManifestKind::List => (project_root.to_path_buf(), Document::List(ListFile::parse(&text))),
        };

        let mut manifest = Self {
            path: normalize(&path),
            base_dir: normalize(&base_dir),
            kind,
            document,
            entries: Vec::new(),
            modified: false,
        };
        manifest.refresh_entries();
        tracing::debug!(
            manifest = %manifest.path.display(),
            kind = %manifest.kind,
            entries = manifest.entries.len(),
            "loaded manifest"
        );
        Ok(manifest)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ManifestKind {
        self.kind
    }

    /// Directory that relative references resolve against
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Entries in file order
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Whether [`Manifest::rewrite`] changed anything since loading
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Replace the reference of the entry identified by `key`.
    ///
    /// Returns `false` when no such entry exists or it already reads `new_reference`.
    pub fn rewrite(&mut self, key: &str, new_reference: &str) -> Result<bool> {
        let changed = match &mut self.document {
            Document::Pbxproj(file) => file.rewrite(key, new_reference)?,
            Document::Catalog(set) => set.rewrite(key, new_reference)?,
            Document::List(list) => list.rewrite(key, new_reference),
        };
        if changed {
            self.modified = true;
            self.refresh_entries();
        }
        Ok(changed)
    }

    /// Serialized manifest contents
    pub fn render(&self) -> Result<String> {
        match &self.document {
            Document::Pbxproj(file) => Ok(file.render()),
            Document::Catalog(set) => set.render(),
            Document::List(list) => Ok(list.render()),
        }
    }

    /// Write the manifest back atomically.
    pub fn save(&self) -> Result<()> {
        let text = self.render()?;
        write_atomic(&self.path, text.as_bytes())
            .context(format!("While saving manifest {}", self.path.display()))?;
        tracing::debug!(manifest = %self.path.display(), "saved manifest");
        Ok(())
    }

    fn refresh_entries(&mut self) {
        self.entries = match &self.document {
            Document::Pbxproj(file) => file.entries(&self.base_dir),
            Document::Catalog(set) => set.entries(&self.base_dir),
            Document::List(list) => list.entries(&self.base_dir),
        };
    }
}

fn resolve_manifest_path(path: &Path) -> PathBuf {
    let is_bundle = path.extension().is_some_and(|e| e == "xcodeproj");
    if is_bundle && path.is_dir() {
        path.join("project.pbxproj")
    } else {
        path.to_path_buf()
    }
}
