//! Asset catalog image sets (`*.imageset/Contents.json`).

use super::ManifestEntry;
use crate::fs::normalize;
use pngoptim_core::{Error, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone)]
pub(crate) struct ImageSet {
    document: Value,
}

impl ImageSet {
    pub(crate) fn parse(path: &Path, text: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(text)
            .map_err(|e| Error::manifest_parse(path, e.to_string()).with_source(e))?;
        if !document.is_object() {
            return Err(Error::manifest_parse(path, "expected a JSON object"));
        }
        Ok(Self { document })
    }

    fn images(&self) -> &[Value] {
        self.document
            .get("images")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// One entry per image with a `filename`, keyed by its index in `images`.
    pub(crate) fn entries(&self, base_dir: &Path) -> Vec<ManifestEntry> {
        self.images()
            .iter()
            .enumerate()
            .filter_map(|(index, image)| {
                let filename = image.get("filename")?.as_str()?;
                let metadata: BTreeMap<String, String> = image
                    .as_object()?
                    .iter()
                    .filter(|(k, _)| k.as_str() != "filename")
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect();
                Some(ManifestEntry {
                    key: index.to_string(),
                    reference: filename.to_string(),
                    location: normalize(&base_dir.join(filename)),
                    metadata,
                })
            })
            .collect()
    }

    pub(crate) fn rewrite(&mut self, key: &str, new_reference: &str) -> Result<bool> {
        let Ok(index) = key.parse::<usize>() else {
            return Ok(false);
        };
        let Some(image) = self
            .document
            .get_mut("images")
            .and_then(Value::as_array_mut)
            .and_then(|images| images.get_mut(index))
            .and_then(Value::as_object_mut)
        else {
            return Ok(false);
        };
        match image.get("filename").and_then(Value::as_str) {
            Some(current) if current != new_reference => {
                image.insert("filename".to_string(), Value::String(new_reference.to_string()));
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub(crate) fn render(&self) -> Result<String> {
        let mut text = serde_json::to_string_pretty(&self.document)?;
        text.push('\n');
        Ok(text)
    }
}
