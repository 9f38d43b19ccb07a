//! Aggregated run outcome.

use crate::result::{ConversionResult, Outcome, SkipReason};
use crate::rewriter::RewriteStats;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Counts and per-asset results for one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub dry_run: bool,
    pub converted: usize,
    pub would_convert: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
    pub failed: usize,
    /// Size of the converted PNGs
    pub bytes_before: u64,
    /// Size of the JPEGs that replaced them
    pub bytes_after: u64,
    pub duration_ms: u64,
    pub rewrite: RewriteStats,
    pub results: Vec<ConversionResult>,
}

impl RunSummary {
    pub fn new(
        results: Vec<ConversionResult>,
        rewrite: RewriteStats,
        dry_run: bool,
        duration: Duration,
    ) -> Self {
        let mut summary = Self {
            dry_run,
            converted: 0,
            would_convert: 0,
            skipped: BTreeMap::new(),
            failed: 0,
            bytes_before: 0,
            bytes_after: 0,
            duration_ms: duration.as_millis() as u64,
            rewrite,
            results: Vec::new(),
        };

        for result in &results {
            match &result.outcome {
                Outcome::Converted => {
                    summary.converted += 1;
                    summary.bytes_before += result.source_bytes;
                    summary.bytes_after += result.output_bytes.unwrap_or(0);
                }
                Outcome::WouldConvert => summary.would_convert += 1,
                Outcome::Skipped(reason) => *summary.skipped.entry(*reason).or_insert(0) += 1,
                Outcome::Failed(_) => summary.failed += 1,
            }
        }
        summary.results = results;
        summary
    }

    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }

    /// Bytes saved by converted assets; negative if they grew overall.
    pub fn bytes_saved(&self) -> i64 {
        self.bytes_before as i64 - self.bytes_after as i64
    }

    pub fn failures(&self) -> impl Iterator<Item = &ConversionResult> {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Failed(_)))
    }
}
