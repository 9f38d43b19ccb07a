//! One end-to-end run: scan, evaluate, convert, rewrite.

use crate::asset::Asset;
use crate::error::AssetError;
use crate::pipeline::{CancelToken, Converter};
use crate::policy::{Eligibility, EligibilityPolicy};
use crate::project::Project;
use crate::result::ConversionResult;
use crate::rewriter::{ReferenceRewriter, RewriteStats};
use crate::scanner::{AssetScanner, ScanItem};
use crate::summary::RunSummary;
use pngoptim_core::config::PolicyConfig;
use pngoptim_core::Result;
use pngoptim_telemetry::Timer;
use std::collections::HashMap;
use std::path::PathBuf;

/// What a run does besides converting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Scan and evaluate only; nothing on disk changes
    pub dry_run: bool,
    /// Decode alpha-declaring PNGs to see whether transparency is used
    pub inspect_alpha_pixels: bool,
    pub policy: EligibilityPolicy,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from(&PolicyConfig::default())
    }
}

impl From<&PolicyConfig> for RunOptions {
    fn from(config: &PolicyConfig) -> Self {
        Self {
            dry_run: false,
            inspect_alpha_pixels: config.inspect_alpha_pixels,
            policy: EligibilityPolicy::from(config),
        }
    }
}

/// Drives a run over one project.
pub struct Runner<'a> {
    project: &'a Project,
    converter: &'a Converter,
    options: RunOptions,
    cancel: CancelToken,
}

impl<'a> Runner<'a> {
    pub fn new(project: &'a Project, converter: &'a Converter, options: RunOptions) -> Self {
        Self {
            project,
            converter,
            options,
            cancel: CancelToken::new(),
        }
    }

    /// Share a cancel token with the caller.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn run(&self) -> Result<RunSummary> {
        self.run_with(|_| {}, |_| {})
    }

    /// Run, calling `on_convert_start` with the number of eligible assets
    /// before conversion begins and `on_result` as each one finishes.
    pub fn run_with<S, R>(&self, on_convert_start: S, on_result: R) -> Result<RunSummary>
    where
        S: FnOnce(usize),
        R: Fn(&ConversionResult) + Sync,
    {
        let started = Timer::start("run");
        let scan = Timer::start("scan");
        let mut scanner = AssetScanner::for_project(self.project)?;
        if self.options.inspect_alpha_pixels {
            scanner = scanner.with_alpha_inspection(self.converter.codec());
        }

        let mut slots: Vec<Option<ConversionResult>> = Vec::with_capacity(scanner.len());
        let mut candidates: Vec<(usize, Asset)> = Vec::new();

        for item in scanner {
            match item {
                ScanItem::Failed {
                    path,
                    references,
                    byte_size,
                    error,
                } => slots.push(Some(ConversionResult::failed_path(path, references, byte_size, error))),
                ScanItem::Found(asset) => match self.options.policy.evaluate(&asset) {
                    Eligibility::Ineligible(reason) => {
                        tracing::debug!(asset = %asset.path.display(), %reason, "skipped");
                        slots.push(Some(ConversionResult::skipped(&asset, reason)));
                    }
                    Eligibility::Eligible if self.options.dry_run => {
                        slots.push(Some(ConversionResult::would_convert(&asset)));
                    }
                    Eligibility::Eligible => {
                        candidates.push((slots.len(), asset));
                        slots.push(None);
                    }
                },
            }
        }

        let (eligible_slots, eligible) = reject_shared_outputs(candidates, &mut slots);
        tracing::info!(scanned = slots.len(), eligible = eligible.len(), "scan complete");
        scan.stop();

        if !eligible.is_empty() {
            let convert = Timer::start("convert");
            on_convert_start(eligible.len());
            let converted = self.converter.convert_all(&eligible, &self.cancel, on_result)?;
            for (slot, result) in eligible_slots.into_iter().zip(converted) {
                slots[slot] = Some(result);
            }
            convert.stop();
        }

        let mut results: Vec<ConversionResult> = slots.into_iter().flatten().collect();
        let rewrite = if self.options.dry_run {
            RewriteStats::default()
        } else {
            let timer = Timer::start("rewrite");
            let stats = ReferenceRewriter::new(self.project).apply(&mut results);
            timer.stop();
            stats
        };

        let summary = RunSummary::new(results, rewrite, self.options.dry_run, started.stop());
        tracing::info!(
            converted = summary.converted,
            skipped = summary.skipped_total(),
            failed = summary.failed,
            saved = summary.bytes_saved(),
            "run complete"
        );
        Ok(summary)
    }
}

/// Fail every asset whose JPEG name is shared with another asset, such as
/// `a.png` and `a.PNG`. Returns the slots and assets that are safe to convert.
fn reject_shared_outputs(
    candidates: Vec<(usize, Asset)>,
    slots: &mut [Option<ConversionResult>],
) -> (Vec<usize>, Vec<Asset>) {
    let mut claims: HashMap<PathBuf, usize> = HashMap::new();
    for (_, asset) in &candidates {
        *claims.entry(asset.jpeg_path()).or_default() += 1;
    }

    let mut eligible_slots = Vec::with_capacity(candidates.len());
    let mut eligible = Vec::with_capacity(candidates.len());
    for (slot, asset) in candidates {
        let output = asset.jpeg_path();
        if claims.get(&output).copied().unwrap_or(0) > 1 {
            let error = AssetError::conflict(format!(
                "{} would be written by more than one asset",
                output.display()
            ));
            tracing::warn!(asset = %asset.path.display(), error = %error, "conversion refused");
            slots[slot] = Some(ConversionResult::failed(&asset, error));
        } else {
            eligible_slots.push(slot);
            eligible.push(asset);
        }
    }
    (eligible_slots, eligible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::tests::asset;
    use crate::error::AssetErrorKind;
    use crate::result::Outcome;
    use pngoptim_image::ImageFormat;

    fn at(path: &str) -> Asset {
        Asset {
            path: PathBuf::from(path),
            ..asset(ImageFormat::Png, 4096, false)
        }
    }

    #[test]
    fn test_shared_jpeg_names_are_refused() {
        let candidates = vec![
            (0, at("/p/a.png")),
            (1, at("/p/b.png")),
            (2, at("/p/a.PNG")),
        ];
        let mut slots = vec![None, None, None];

        let (eligible_slots, eligible) = reject_shared_outputs(candidates, &mut slots);

        assert_eq!(eligible_slots, vec![1]);
        assert_eq!(eligible[0].path, PathBuf::from("/p/b.png"));
        for slot in [0, 2] {
            match &slots[slot].as_ref().unwrap().outcome {
                Outcome::Failed(e) => assert_eq!(e.kind, AssetErrorKind::OutputConflict),
                other => panic!("unexpected outcome {:?}", other),
            }
        }
        assert!(slots[1].is_none());
    }
}
