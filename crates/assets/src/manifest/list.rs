//! Plain list manifests: one asset path per line.

use super::ManifestEntry;
use crate::fs::normalize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone)]
pub(crate) struct ListFile {
    lines: Vec<String>,
}

impl ListFile {
    pub(crate) fn parse(text: &str) -> Self {
        Self {
            lines: text.split('\n').map(str::to_string).collect(),
        }
    }

    /// Entries keyed by zero-based line number. Blank lines and `#` comments are not entries.
    pub(crate) fn entries(&self, base_dir: &Path) -> Vec<ManifestEntry> {
        self.lines
            .iter()
            .enumerate()
            .filter_map(|(number, line)| {
                let reference = line.trim();
                if reference.is_empty() || reference.starts_with('#') {
                    return None;
                }
                Some(ManifestEntry {
                    key: number.to_string(),
                    reference: reference.to_string(),
                    location: normalize(&base_dir.join(reference)),
                    metadata: BTreeMap::new(),
                })
            })
            .collect()
    }

    pub(crate) fn rewrite(&mut self, key: &str, new_reference: &str) -> bool {
        let Some(line) = key.parse::<usize>().ok().and_then(|n| self.lines.get_mut(n)) else {
            return false;
        };
        let current = line.trim();
        if current.is_empty() || current.starts_with('#') || current == new_reference {
            return false;
        }
        *line = line.replacen(current, new_reference, 1);
        true
    }

    pub(crate) fn render(&self) -> String {
        self.lines.join("\n")
    }
}
