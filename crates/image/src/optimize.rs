//! Lossless JPEG optimization capability.
//!
//! Contract for every [`Optimizer`]: bytes in, bytes out, never larger than
//! the input, and identical output for identical input.

use crate::{ImageError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// A lossless size-reduction pass over encoded JPEG bytes.
pub trait Optimizer: Send + Sync {
    /// Short name used in logs and summaries.
    fn name(&self) -> &str;

    /// Optimize `data`, returning bytes no larger than the input.
    fn optimize(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Returns its input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Optimizer for Passthrough {
    fn name(&self) -> &str {
        "none"
    }

    fn optimize(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }
}

/// Runs an external `jpegoptim`-compatible program that rewrites a file in place.
#[derive(Debug, Clone)]
pub struct JpegOptim {
    program: PathBuf,
    args: Vec<String>,
}

impl JpegOptim {
    /// Locate `program` on `PATH` (or accept it as a path) and keep `args`.
    pub fn locate(program: &str, args: Vec<String>) -> Result<Self> {
        let program = which::which(program)
            .map_err(|e| ImageError::OptimizerNotFound(format!("{}: {}", program, e)))?;
        Ok(Self { program, args })
    }

    /// Resolved program path.
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn run_in_place(&self, path: &Path) -> Result<()> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                ImageError::OptimizerFailed(format!("failed to execute {}: {}", self.program.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ImageError::OptimizerFailed(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }
        Ok(())
    }
}

impl Optimizer for JpegOptim {
    fn name(&self) -> &str {
        self.program
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("jpegoptim")
    }

    fn optimize(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut scratch = tempfile::Builder::new()
            .prefix("pngoptim-")
            .suffix(".jpg")
            .tempfile()?;
        scratch.write_all(data)?;
        scratch.flush()?;

        self.run_in_place(scratch.path())?;

        let optimized = std::fs::read(scratch.path())?;
        if optimized.is_empty() {
            return Err(ImageError::OptimizerFailed(format!(
                "{} left an empty file",
                self.program.display()
            )));
        }
        if optimized.len() > data.len() {
            tracing::debug!(
                optimizer = self.name(),
                before = data.len(),
                after = optimized.len(),
                "optimizer grew the file, keeping encoder output"
            );
            return Ok(data.to_vec());
        }
        Ok(optimized)
    }
}
