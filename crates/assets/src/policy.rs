//! Conversion eligibility.
//!
//! A pure decision over an [`Asset`]'s attributes. Rules are checked in a
//! fixed order and the first match wins, so an image with alpha is reported
//! as such even when it is also too small.

use crate::asset::Asset;
use pngoptim_core::config::PolicyConfig;
use pngoptim_image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why an asset will not be converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityReason {
    /// Transparency would be lost
    AlphaChannelRequired,
    /// Not a PNG
    AlreadyOptimalFormat,
    /// Too small to be worth it
    BelowSizeThreshold,
    /// Embedded colour profile or 16-bit samples
    UnsupportedColorProfile,
}

impl fmt::Display for EligibilityReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EligibilityReason::AlphaChannelRequired => "alpha channel required",
            EligibilityReason::AlreadyOptimalFormat => "already optimal format",
            EligibilityReason::BelowSizeThreshold => "below size threshold",
            EligibilityReason::UnsupportedColorProfile => "unsupported color profile",
        };
        f.write_str(label)
    }
}

/// Policy decision for one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Ineligible(EligibilityReason),
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }
}

/// Thresholds the decision is made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilityPolicy {
    pub min_size_bytes: u64,
    pub skip_color_profiles: bool,
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self::from(&PolicyConfig::default())
    }
}

impl From<&PolicyConfig> for EligibilityPolicy {
    fn from(config: &PolicyConfig) -> Self {
        Self {
            min_size_bytes: config.min_size_bytes,
            skip_color_profiles: config.skip_color_profiles,
        }
    }
}

impl EligibilityPolicy {
    pub fn evaluate(&self, asset: &Asset) -> Eligibility {
        use EligibilityReason::*;

        if asset.format != ImageFormat::Png {
            return Eligibility::Ineligible(AlreadyOptimalFormat);
        }
        if asset.has_alpha {
            return Eligibility::Ineligible(AlphaChannelRequired);
        }
        if asset.byte_size < self.min_size_bytes {
            return Eligibility::Ineligible(BelowSizeThreshold);
        }
        if self.skip_color_profiles && (asset.has_color_profile || asset.is_high_bit_depth()) {
            return Eligibility::Ineligible(UnsupportedColorProfile);
        }
        Eligibility::Eligible
    }
}
