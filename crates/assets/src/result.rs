//! Per-asset outcomes.

use crate::asset::{Asset, AssetReference};
use crate::error::AssetError;
use crate::policy::EligibilityReason;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Why an asset was left as it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlphaChannelRequired,
    AlreadyOptimalFormat,
    BelowSizeThreshold,
    UnsupportedColorProfile,
    /// Converted, but no manifest entry could be updated to point at the JPEG
    ReferenceNotFound,
    /// The run was cancelled before the asset started
    Cancelled,
}

impl From<EligibilityReason> for SkipReason {
    fn from(reason: EligibilityReason) -> Self {
        match reason {
            EligibilityReason::AlphaChannelRequired => SkipReason::AlphaChannelRequired,
            EligibilityReason::AlreadyOptimalFormat => SkipReason::AlreadyOptimalFormat,
            EligibilityReason::BelowSizeThreshold => SkipReason::BelowSizeThreshold,
            EligibilityReason::UnsupportedColorProfile => SkipReason::UnsupportedColorProfile,
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SkipReason::AlphaChannelRequired => "alpha channel required",
            SkipReason::AlreadyOptimalFormat => "already optimal format",
            SkipReason::BelowSizeThreshold => "below size threshold",
            SkipReason::UnsupportedColorProfile => "unsupported color profile",
            SkipReason::ReferenceNotFound => "reference not found",
            SkipReason::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// What happened to an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    Converted,
    /// Eligible, but the run was a dry run
    WouldConvert,
    Skipped(SkipReason),
    Failed(AssetError),
}

/// The result of processing one asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionResult {
    pub source: PathBuf,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<AssetReference>,
    #[serde(flatten)]
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    pub source_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_bytes: Option<u64>,
}

impl ConversionResult {
    fn for_asset(asset: &Asset, outcome: Outcome) -> Self {
        Self {
            source: asset.path.clone(),
            references: asset.references.clone(),
            outcome,
            output_path: None,
            source_bytes: asset.byte_size,
            output_bytes: None,
        }
    }

    pub fn converted(asset: &Asset, output_path: PathBuf, output_bytes: u64) -> Self {
        Self {
            output_path: Some(output_path),
            output_bytes: Some(output_bytes),
            ..Self::for_asset(asset, Outcome::Converted)
        }
    }

    pub fn would_convert(asset: &Asset) -> Self {
        Self {
            output_path: Some(asset.jpeg_path()),
            ..Self::for_asset(asset, Outcome::WouldConvert)
        }
    }

    pub fn skipped(asset: &Asset, reason: impl Into<SkipReason>) -> Self {
        Self::for_asset(asset, Outcome::Skipped(reason.into()))
    }

    pub fn failed(asset: &Asset, error: AssetError) -> Self {
        Self::for_asset(asset, Outcome::Failed(error))
    }

    /// A failure for a file that never became an [`Asset`].
    pub fn failed_path(
        source: PathBuf,
        references: Vec<AssetReference>,
        source_bytes: u64,
        error: AssetError,
    ) -> Self {
        Self {
            source,
            references,
            outcome: Outcome::Failed(error),
            output_path: None,
            source_bytes,
            output_bytes: None,
        }
    }

    pub fn is_converted(&self) -> bool {
        matches!(self.outcome, Outcome::Converted)
    }

    /// Bytes saved by the conversion; negative if the output grew.
    pub fn byte_delta(&self) -> i64 {
        match (&self.outcome, self.output_bytes) {
            (Outcome::Converted, Some(out)) => self.source_bytes as i64 - out as i64,
            _ => 0,
        }
    }
}
