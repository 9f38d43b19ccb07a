//! File scanning utilities
//!
//! Provides file discovery with filtering, used to locate manifests inside a
//! project tree.

use crate::error::Result;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Directories that never contain source manifests
pub const BUILD_OUTPUT_DIRS: &[&str] = &["DerivedData", "build", "Pods", "Carthage"];

/// File scanner with configurable filters
pub struct FileScanner {
    root: PathBuf,
    file_names: Vec<String>,
    exclude_dirs: Vec<String>,
}

impl FileScanner {
    /// Create a new file scanner rooted at the given path
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            file_names: Vec::new(),
            exclude_dirs: Vec::new(),
        }
    }

    /// Filter by exact file names (e.g., "project.pbxproj")
    pub fn with_file_names(mut self, names: &[&str]) -> Self {
        self.file_names = names.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Skip directories with these names entirely
    pub fn exclude_dirs(mut self, names: &[&str]) -> Self {
        self.exclude_dirs = names.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Scan and return matching files, sorted by path
    pub fn scan(&self) -> Result<Vec<PathBuf>> {
        let walker = WalkDir::new(&self.root).sort_by_file_name();
        let mut files = Vec::new();
        for entry in walker.into_iter().filter_entry(|e| !self.is_skipped_dir(e)) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if self.matches(path) {
                files.push(path.to_path_buf());
            }
        }

        Ok(files)
    }

    fn matches(&self, path: &Path) -> bool {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        self.file_names.is_empty() || self.file_names.iter().any(|n| n == name)
    }

    fn is_skipped_dir(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_str().unwrap_or("");
        is_hidden(name) || self.exclude_dirs.iter().any(|d| d == name)
    }
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.') && name != "." && name != ".."
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_file_scanner_new() {
        let scanner = FileScanner::new("/tmp").with_file_names(&["Contents.json"]);
        assert_eq!(scanner.root, PathBuf::from("/tmp"));
        assert_eq!(scanner.file_names, vec!["Contents.json"]);
        assert!(scanner.exclude_dirs.is_empty());
    }

    #[test]
    fn test_scan_filters_names_and_skips_dirs() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("App.xcodeproj")).unwrap();
        fs::create_dir_all(root.join("DerivedData/App.xcodeproj")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("App.xcodeproj/project.pbxproj"), "").unwrap();
        fs::write(root.join("DerivedData/App.xcodeproj/project.pbxproj"), "").unwrap();
        fs::write(root.join(".git/project.pbxproj"), "").unwrap();
        fs::write(root.join("README.md"), "").unwrap();

        let found = FileScanner::new(root)
            .with_file_names(&["project.pbxproj"])
            .exclude_dirs(BUILD_OUTPUT_DIRS)
            .scan()
            .unwrap();

        assert_eq!(found, vec![root.join("App.xcodeproj/project.pbxproj")]);
    }
}
