//! Crash-safe file replacement.
//!
//! Bytes are written to a temporary file next to the destination, synced,
//! and only then renamed over the final name. A staged file that is dropped
//! without [`StagedFile::commit`] is removed and never becomes visible.

use pngoptim_core::{Error, Result};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;

/// Bytes durably written under a temporary name, waiting to be promoted.
#[derive(Debug)]
pub struct StagedFile {
    temp: NamedTempFile,
    destination: PathBuf,
    len: u64,
}

impl StagedFile {
    /// Write `bytes` to a temporary file in the destination's directory.
    pub fn stage(destination: &Path, bytes: &[u8]) -> Result<Self> {
        let dir = destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut temp = tempfile::Builder::new()
            .prefix(".pngoptim-")
            .suffix(".tmp")
            .tempfile_in(dir)?;
        temp.write_all(bytes)?;
        temp.flush()?;
        temp.as_file().sync_all()?;
        let len = temp.as_file().metadata()?.len();

        Ok(Self {
            temp,
            destination: destination.to_path_buf(),
            len,
        })
    }

    /// Size of the staged file as reported by the filesystem.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether nothing was written.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Where the file will live once committed.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Move the staged file into place, refusing to replace an existing file.
    ///
    /// Fails with [`pngoptim_core::ErrorCode::FileExists`] when the destination is taken.
    pub fn commit_new(self) -> Result<PathBuf> {
        let destination = self.destination;
        self.temp.persist_noclobber(&destination).map_err(|e| {
            Error::from(e.error).with_context(format!("While moving file into {}", destination.display()))
        })?;
        sync_parent(&destination);
        Ok(destination)
    }

    /// Rename the staged file over its destination.
    pub fn commit(self) -> Result<PathBuf> {
        let destination = self.destination;
        self.temp.persist(&destination).map_err(|e| {
            Error::io(format!("Failed to move file into {}: {}", destination.display(), e.error))
                .with_source(e.error)
        })?;
        sync_parent(&destination);
        Ok(destination)
    }
}

/// Replace `path` with `bytes` atomically.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let staged = StagedFile::stage(path, bytes)?;
    if staged.len() != bytes.len() as u64 {
        return Err(Error::io(format!(
            "Short write to {}: {} of {} bytes",
            path.display(),
            staged.len(),
            bytes.len()
        )));
    }
    staged.commit().map(|_| ())
}

#[cfg(unix)]
fn sync_parent(path: &Path) {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = std::fs::File::open(parent).and_then(|dir| dir.sync_all()) {
            tracing::debug!(dir = %parent.display(), error = %e, "directory sync failed");
        }
    }
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) {}

/// Lexically normalize a path: drop `.` components and fold `..` into its parent.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pngoptim_core::ErrorCode;
    use tempfile::TempDir;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_commit_moves_into_place() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("a.jpg");
        let staged = StagedFile::stage(&dest, b"jpeg bytes").unwrap();
        assert_eq!(staged.len(), 10);
        assert!(!dest.exists());

        staged.commit().unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"jpeg bytes");
        assert_eq!(entries(dir.path()), vec!["a.jpg"]);
    }

    #[test]
    fn test_commit_new_keeps_existing_file() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("a.jpg");
        std::fs::write(&dest, b"original").unwrap();

        let err = StagedFile::stage(&dest, b"new bytes").unwrap().commit_new().unwrap_err();
        assert_eq!(err.code, ErrorCode::FileExists);
        assert_eq!(std::fs::read(&dest).unwrap(), b"original");
        assert_eq!(entries(dir.path()), vec!["a.jpg"]);
    }

    #[test]
    fn test_dropped_stage_leaves_nothing() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("a.jpg");
        {
            let _staged = StagedFile::stage(&dest, b"abandoned").unwrap();
        }
        assert!(entries(dir.path()).is_empty());
    }

    #[test]
    fn test_write_atomic_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list.txt");
        std::fs::write(&path, "old").unwrap();
        write_atomic(&path, b"new").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/p/./a/../b.png")), PathBuf::from("/p/b.png"));
        assert_eq!(normalize(Path::new("../x.png")), PathBuf::from("../x.png"));
    }
}
