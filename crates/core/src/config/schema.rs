//! Configuration schema definitions

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ConfigSchema {
    #[serde(default)]
    pub conversion: ConversionConfig,

    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub optimizer: OptimizerConfig,
}

impl ConfigSchema {
    /// Check that every value is within its accepted range
    pub fn validate(&self) -> Result<()> {
        self.conversion.validate()?;
        self.optimizer.validate()
    }
}

/// JPEG encoding and pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversionConfig {
    /// JPEG quality (1-100)
    #[serde(default = "default_quality")]
    pub quality: u8,

    /// Largest accepted output size as a fraction of the source size
    #[serde(default = "default_max_output_ratio")]
    pub max_output_ratio: f64,

    /// Worker threads; 0 uses the available parallelism
    #[serde(default)]
    pub jobs: usize,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            quality: default_quality(),
            max_output_ratio: default_max_output_ratio(),
            jobs: 0,
        }
    }
}

impl ConversionConfig {
    fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.quality) {
            return Err(Error::invalid_config_value(
                "conversion.quality",
                format!("{} is outside 1-100", self.quality),
            ));
        }
        if !(self.max_output_ratio > 0.0 && self.max_output_ratio <= 1.0) {
            return Err(Error::invalid_config_value(
                "conversion.max_output_ratio",
                format!("{} is outside (0, 1]", self.max_output_ratio),
            ));
        }
        Ok(())
    }
}

fn default_quality() -> u8 {
    85
}

fn default_max_output_ratio() -> f64 {
    1.0
}

/// Eligibility policy settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyConfig {
    /// PNGs smaller than this are left alone
    #[serde(default = "default_min_size_bytes")]
    pub min_size_bytes: u64,

    /// Skip PNGs with an embedded ICC profile or 16-bit samples
    #[serde(default = "default_true")]
    pub skip_color_profiles: bool,

    /// Decode PNGs that declare alpha and check whether any pixel uses it
    #[serde(default = "default_true")]
    pub inspect_alpha_pixels: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            min_size_bytes: default_min_size_bytes(),
            skip_color_profiles: true,
            inspect_alpha_pixels: true,
        }
    }
}

fn default_min_size_bytes() -> u64 {
    1024
}

fn default_true() -> bool {
    true
}

/// Which lossless optimizer runs on encoded JPEG bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    /// External `jpegoptim` binary
    #[default]
    Jpegoptim,
    /// Keep encoder output as is
    None,
}

/// Optimizer settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptimizerConfig {
    #[serde(default)]
    pub kind: OptimizerKind,

    /// Program name or path
    #[serde(default = "default_optimizer_program")]
    pub program: String,

    /// Arguments passed before the file name
    #[serde(default = "default_optimizer_args")]
    pub args: Vec<String>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            kind: OptimizerKind::default(),
            program: default_optimizer_program(),
            args: default_optimizer_args(),
        }
    }
}

impl OptimizerConfig {
    fn validate(&self) -> Result<()> {
        if self.kind == OptimizerKind::Jpegoptim && self.program.trim().is_empty() {
            return Err(Error::invalid_config_value("optimizer.program", "must not be empty"));
        }
        Ok(())
    }
}

fn default_optimizer_program() -> String {
    "jpegoptim".to_string()
}

fn default_optimizer_args() -> Vec<String> {
    vec!["--strip-all".to_string(), "--all-progressive".to_string(), "--quiet".to_string()]
}
