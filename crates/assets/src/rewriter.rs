//! Manifest rewriting after conversion.
//!
//! Runs on the calling thread once every conversion has finished. For each
//! converted asset the order is: JPEG already promoted, manifests saved,
//! then the PNG deleted. Stopping anywhere in between leaves a project that
//! still builds.

use crate::asset::with_jpeg_extension;
use crate::error::{AssetError, AssetErrorKind};
use crate::manifest::Manifest;
use crate::project::Project;
use crate::result::{ConversionResult, Outcome, SkipReason};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// Counters for one rewrite pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RewriteStats {
    pub manifests_saved: usize,
    pub entries_rewritten: usize,
    pub originals_deleted: usize,
}

#[derive(Debug, Default)]
struct Progress {
    rewritten: usize,
    failure: Option<String>,
}

/// Points manifest entries at converted JPEGs and removes the PNGs they replace.
pub struct ReferenceRewriter<'a> {
    project: &'a Project,
}

impl<'a> ReferenceRewriter<'a> {
    pub fn new(project: &'a Project) -> Self {
        Self { project }
    }

    /// Rewrite references for every converted result.
    ///
    /// Results whose entries can no longer be found become
    /// `Skipped(ReferenceNotFound)`; results whose manifest could not be
    /// saved become `Failed(RewriteFailure)`. Either way the PNG stays.
    pub fn apply(&self, results: &mut [ConversionResult]) -> RewriteStats {
        let converted: HashMap<PathBuf, usize> = results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_converted())
            .map(|(i, r)| (r.source.clone(), i))
            .collect();
        let mut stats = RewriteStats::default();
        if converted.is_empty() {
            return stats;
        }

        let mut progress: HashMap<usize, Progress> = HashMap::new();
        for manifest_path in self.project.manifest_paths() {
            self.rewrite_manifest(manifest_path, &converted, results, &mut progress, &mut stats);
        }

        for &index in converted.values() {
            let state = progress.remove(&index).unwrap_or_default();
            let result = &mut results[index];

            if let Some(message) = state.failure {
                tracing::warn!(asset = %result.source.display(), "{}", message);
                result.outcome = Outcome::Failed(AssetError::new(AssetErrorKind::RewriteFailure, message));
                continue;
            }

            if state.rewritten == 0 {
                tracing::warn!(asset = %result.source.display(), "no manifest entry left to rewrite");
                if let Some(output) = result.output_path.take() {
                    remove_file(&output);
                }
                result.output_bytes = None;
                result.outcome = Outcome::Skipped(SkipReason::ReferenceNotFound);
                continue;
            }

            if remove_file(&result.source) {
                stats.originals_deleted += 1;
            }
        }

        tracing::info!(
            manifests = stats.manifests_saved,
            entries = stats.entries_rewritten,
            deleted = stats.originals_deleted,
            "rewrote references"
        );
        stats
    }

    fn rewrite_manifest(
        &self,
        manifest_path: &Path,
        converted: &HashMap<PathBuf, usize>,
        results: &[ConversionResult],
        progress: &mut HashMap<usize, Progress>,
        stats: &mut RewriteStats,
    ) {
        let mut manifest = match Manifest::open(manifest_path, self.project.root()) {
            Ok(manifest) => manifest,
            Err(e) => {
                let message = format!("could not reload {}: {}", manifest_path.display(), e.message);
                for &index in converted.values() {
                    if results[index].references.iter().any(|r| r.manifest == manifest_path) {
                        progress.entry(index).or_default().failure = Some(message.clone());
                    }
                }
                return;
            }
        };

        let targets: Vec<(String, String, usize)> = manifest
            .entries()
            .iter()
            .filter_map(|entry| {
                let index = *converted.get(&entry.location)?;
                Some((entry.key.clone(), with_jpeg_extension(&entry.reference), index))
            })
            .collect();
        if targets.is_empty() {
            return;
        }

        let mut touched = BTreeSet::new();
        let mut rewritten = 0;
        for (key, new_reference, index) in targets {
            match manifest.rewrite(&key, &new_reference) {
                Ok(true) => {
                    touched.insert(index);
                    rewritten += 1;
                    progress.entry(index).or_default().rewritten += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    progress.entry(index).or_default().failure =
                        Some(format!("could not rewrite {}: {}", manifest_path.display(), e.message));
                }
            }
        }

        if !manifest.is_modified() {
            return;
        }
        match manifest.save() {
            Ok(()) => {
                stats.manifests_saved += 1;
                stats.entries_rewritten += rewritten;
                tracing::debug!(
                    manifest = %manifest_path.display(),
                    assets = touched.len(),
                    entries = rewritten,
                    "manifest updated"
                );
            }
            Err(e) => {
                let message = format!("could not save {}: {}", manifest_path.display(), e.message);
                for index in touched {
                    progress.entry(index).or_default().failure = Some(message.clone());
                }
            }
        }
    }
}

/// Remove a file, logging instead of failing.
fn remove_file(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(file = %path.display(), error = %e, "could not remove file");
            false
        }
    }
}
