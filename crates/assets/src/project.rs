//! A project: a root directory and the manifests that describe its assets.

use crate::fs::normalize;
use crate::manifest::{Manifest, ManifestKind, LIST_MANIFEST_NAME};
use pngoptim_core::file_scanner::{FileScanner, BUILD_OUTPUT_DIRS};
use pngoptim_core::{Error, Result};
use std::path::{Path, PathBuf};

/// Project root plus its manifest paths.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    manifests: Vec<PathBuf>,
}

impl Project {
    /// Resolve a project.
    ///
    /// With no explicit manifests the root is searched for Xcode projects,
    /// image sets and a root-level `assets.manifest`. Either way, a project
    /// without manifests is a configuration error.
    pub fn open(root: &Path, manifests: &[PathBuf]) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::project_not_found(root));
        }
        let root = absolute(root)?;

        let manifests = if manifests.is_empty() {
            discover_manifests(&root)?
        } else {
            manifests
                .iter()
                .map(|m| resolve_explicit(&root, m))
                .collect::<Result<Vec<_>>>()?
        };

        if manifests.is_empty() {
            return Err(Error::no_manifests(&root));
        }

        tracing::info!(root = %root.display(), manifests = manifests.len(), "resolved project");
        Ok(Self { root, manifests })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Manifest files, in discovery order
    pub fn manifest_paths(&self) -> &[PathBuf] {
        &self.manifests
    }

    /// Load every manifest from disk.
    pub fn load_manifests(&self) -> Result<Vec<Manifest>> {
        self.manifests
            .iter()
            .map(|path| Manifest::open(path, &self.root))
            .collect()
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Ok(normalize(&path))
}

/// Explicit manifests may be given relative to the working directory or the project root.
fn resolve_explicit(root: &Path, manifest: &Path) -> Result<PathBuf> {
    let candidate = if manifest.is_relative() && !manifest.exists() {
        root.join(manifest)
    } else {
        absolute(manifest)?
    };
    if !candidate.exists() {
        return Err(Error::file_not_found(&candidate)
            .with_context("While resolving --manifest")
            .with_suggestion("Pass a project.pbxproj, an .xcodeproj bundle, an imageset Contents.json or a list file"));
    }
    let is_bundle = candidate.extension().is_some_and(|e| e == "xcodeproj");
    if is_bundle && candidate.is_dir() {
        Ok(normalize(&candidate.join("project.pbxproj")))
    } else {
        Ok(normalize(&candidate))
    }
}

/// Find manifests under `root`, skipping hidden and build output directories.
pub fn discover_manifests(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found: Vec<PathBuf> = FileScanner::new(root)
        .with_file_names(&["project.pbxproj", "Contents.json"])
        .exclude_dirs(BUILD_OUTPUT_DIRS)
        .scan()?
        .into_iter()
        .filter(|path| ManifestKind::for_path(path) != ManifestKind::List)
        .collect();

    let list = root.join(LIST_MANIFEST_NAME);
    if list.is_file() {
        found.push(list);
    }

    tracing::debug!(root = %root.display(), found = found.len(), "discovered manifests");
    Ok(found)
}
