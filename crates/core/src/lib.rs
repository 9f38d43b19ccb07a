//! Core utilities for xcode-png-optim
//!
//! This crate provides shared functionality used by the asset pipeline and the CLI:
//!
//! - **Error handling**: errors with codes, context, and recovery suggestions
//! - **File scanning**: file discovery with filtering
//! - **Configuration**: TOML-based configuration with validation
//!
//! # Example
//!
//! ```rust,no_run
//! use pngoptim_core::config::Config;
//! use std::path::Path;
//!
//! let config = Config::load(Path::new("MyApp"), None).expect("invalid configuration");
//! println!("JPEG quality: {}", config.schema.conversion.quality);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod file_scanner;

pub use error::{Error, ErrorCode, Result, ResultExt};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, ConfigSchema, OptimizerKind};
    pub use crate::error::{exit_codes, Error, ErrorCode, Result, ResultExt};
    pub use crate::file_scanner::FileScanner;
}
