//! Asset scanning, PNG to JPEG conversion and manifest rewriting.
//!
//! A run moves one way through four stages:
//!
//! 1. [`AssetScanner`] reads the project's manifests and inspects each referenced file
//! 2. [`EligibilityPolicy`] decides which PNGs can become JPEGs
//! 3. [`Converter`] writes the JPEGs next to their sources
//! 4. [`ReferenceRewriter`] points the manifests at the JPEGs and removes the PNGs
//!
//! [`Runner`] strings them together.
//!
//! ```no_run
//! use pngoptim_assets::{ConversionOptions, Converter, Project, RunOptions, Runner};
//! use pngoptim_image::{ImageCodec, Passthrough};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let project = Project::open(Path::new("MyApp"), &[])?;
//! let converter = Converter::new(
//!     Arc::new(ImageCodec),
//!     Arc::new(Passthrough),
//!     ConversionOptions::default(),
//! );
//! let summary = Runner::new(&project, &converter, RunOptions::default()).run()?;
//! println!("{} converted", summary.converted);
//! # Ok::<(), pngoptim_core::Error>(())
//! ```

pub mod asset;
pub mod error;
pub mod fs;
pub mod manifest;
pub mod pipeline;
pub mod policy;
pub mod project;
pub mod result;
pub mod rewriter;
pub mod run;
pub mod scanner;
pub mod summary;

pub use asset::{Asset, AssetReference};
pub use error::{AssetError, AssetErrorKind};
pub use manifest::{Manifest, ManifestEntry, ManifestKind};
pub use pipeline::{CancelToken, ConversionOptions, Converter};
pub use policy::{Eligibility, EligibilityPolicy, EligibilityReason};
pub use project::Project;
pub use result::{ConversionResult, Outcome, SkipReason};
pub use rewriter::{ReferenceRewriter, RewriteStats};
pub use run::{RunOptions, Runner};
pub use scanner::{AssetScanner, ScanItem};
pub use summary::RunSummary;
