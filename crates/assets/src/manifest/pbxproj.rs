//! `project.pbxproj` reading and rewriting.
//!
//! Only the parts of the object graph needed to locate image files are
//! parsed: `PBXFileReference` objects with an image type, the groups that
//! contain them, and the `PBXBuildFile` objects that point at them. Edits are
//! applied to the original text so the rest of the file is left byte for byte
//! as Xcode wrote it.

use super::ManifestEntry;
use crate::asset::display_name;
use crate::fs::normalize;
use once_cell::sync::Lazy;
use pngoptim_core::{Error, Result};
use regex::{Captures, Regex};
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::path::{Path, PathBuf};

/// `ID /* comment */ = {` at the start of an object definition
static OBJECT_HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*([0-9A-Fa-f]{24})[ \t]*(?:/\*.*?\*/[ \t]*)?=[ \t]*\{")
        .expect("object header regex")
});

/// `key = value;` with an optional trailing id comment
static PROPERTY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?:^|[\s{;])([A-Za-z][A-Za-z0-9_]*)\s*=\s*("(?:[^"\\]|\\.)*"|[^;\s"(){}]+)(?:\s*/\*.*?\*/)?\s*;"#,
    )
    .expect("property regex")
});

static CHILDREN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"children\s*=\s*\(((?:\s*[0-9A-Fa-f]{24}(?:\s*/\*.*?\*/)?\s*,?)*)\s*\)")
        .expect("children regex")
});

static OBJECT_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9A-Fa-f]{24}").expect("object id regex"));

const GROUP_ISAS: &[&str] = &["PBXGroup", "PBXVariantGroup", "XCVersionGroup"];
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "tif", "tiff", "bmp", "heic"];
const MAX_GROUP_DEPTH: usize = 64;

#[derive(Debug, Clone)]
struct PbxObject {
    isa: String,
    /// Byte range of the `{ ... }` body within the file
    body: Range<usize>,
    properties: HashMap<String, String>,
    children: Vec<String>,
}

impl PbxObject {
    fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    fn file_type(&self) -> Option<&str> {
        self.get("lastKnownFileType").or_else(|| self.get("explicitFileType"))
    }

    fn is_image_reference(&self) -> bool {
        if self.isa != "PBXFileReference" {
            return false;
        }
        if let Some(file_type) = self.file_type() {
            return file_type.starts_with("image.");
        }
        self.get("path")
            .and_then(|p| Path::new(p).extension())
            .and_then(|e| e.to_str())
            .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|i| i.eq_ignore_ascii_case(ext)))
    }

    /// The name Xcode shows in comments next to this object's id.
    fn display_name(&self) -> Option<String> {
        self.get("name")
            .map(str::to_string)
            .or_else(|| self.get("path").map(|p| display_name(Path::new(p))))
    }
}

/// A parsed `project.pbxproj`.
#[derive(Debug, Clone)]
pub(crate) struct PbxprojFile {
    path: PathBuf,
    text: String,
    objects: HashMap<String, PbxObject>,
    /// Object id order as it appears in the file
    order: Vec<String>,
    parents: HashMap<String, String>,
}

impl PbxprojFile {
    pub(crate) fn parse(path: &Path, text: String) -> Result<Self> {
        if !text.trim_start().starts_with("// !$*UTF8*$!") && !text.contains("objects") {
            return Err(Error::manifest_parse(path, "not an Xcode project file"));
        }

        let mut file = Self {
            path: path.to_path_buf(),
            text,
            objects: HashMap::new(),
            order: Vec::new(),
            parents: HashMap::new(),
        };
        file.index()?;
        Ok(file)
    }

    fn index(&mut self) -> Result<()> {
        let mut objects = HashMap::new();
        let mut order = Vec::new();

        for cap in OBJECT_HEADER_RE.captures_iter(&self.text) {
            let (Some(id), Some(whole)) = (cap.get(1), cap.get(0)) else {
                continue;
            };
            let open = whole.end() - 1;
            let close = matching_brace(&self.text, open).ok_or_else(|| {
                Error::manifest_parse(&self.path, format!("unterminated object {}", id.as_str()))
            })?;
            let body = &self.text[open..close];

            let mut properties = HashMap::new();
            for prop in PROPERTY_RE.captures_iter(body) {
                properties
                    .entry(prop[1].to_string())
                    .or_insert_with(|| unquote(&prop[2]));
            }
            let Some(isa) = properties.get("isa").cloned() else {
                continue;
            };
            let children = CHILDREN_RE
                .captures(body)
                .map(|c| {
                    OBJECT_ID_RE
                        .find_iter(&strip_comments(&c[1]))
                        .map(|m| m.as_str().to_string())
                        .collect()
                })
                .unwrap_or_default();

            order.push(id.as_str().to_string());
            objects.insert(
                id.as_str().to_string(),
                PbxObject {
                    isa,
                    body: open..close,
                    properties,
                    children,
                },
            );
        }

        let mut parents = HashMap::new();
        for (id, object) in &objects {
            if GROUP_ISAS.contains(&object.isa.as_str()) {
                for child in &object.children {
                    parents.insert(child.clone(), id.clone());
                }
            }
        }

        self.objects = objects;
        self.order = order;
        self.parents = parents;
        Ok(())
    }

    /// Image file references that resolve to a location on disk.
    pub(crate) fn entries(&self, base_dir: &Path) -> Vec<ManifestEntry> {
        self.order
            .iter()
            .filter_map(|id| {
                let object = self.objects.get(id)?;
                if !object.is_image_reference() {
                    return None;
                }
                let reference = object.get("path")?.to_string();
                let location = self.resolve(id, base_dir, 0)?;

                let mut metadata = BTreeMap::new();
                if let Some(name) = object.get("name") {
                    metadata.insert("name".to_string(), name.to_string());
                }
                if let Some(file_type) = object.file_type() {
                    metadata.insert("fileType".to_string(), file_type.to_string());
                }
                if let Some(tree) = object.get("sourceTree") {
                    metadata.insert("sourceTree".to_string(), tree.to_string());
                }

                Some(ManifestEntry {
                    key: id.clone(),
                    reference,
                    location: normalize(&location),
                    metadata,
                })
            })
            .collect()
    }

    /// Resolve an object's location through its `sourceTree` and parent groups.
    fn resolve(&self, id: &str, base_dir: &Path, depth: usize) -> Option<PathBuf> {
        if depth > MAX_GROUP_DEPTH {
            return None;
        }
        let object = self.objects.get(id)?;
        let path = object.get("path");
        let dir = match object.get("sourceTree").unwrap_or("<group>") {
            "<group>" => match self.parents.get(id) {
                Some(parent) => self.resolve(parent, base_dir, depth + 1)?,
                None => base_dir.to_path_buf(),
            },
            "SOURCE_ROOT" => base_dir.to_path_buf(),
            "<absolute>" => return path.map(PathBuf::from),
            _ => return None,
        };
        Some(match path {
            Some(p) => dir.join(p),
            None => dir,
        })
    }

    /// Point the file reference `id` at `new_reference`.
    ///
    /// Updates `path`, `name` and the file type, then the `/* name */`
    /// comments next to the reference and the build files that use it.
    pub(crate) fn rewrite(&mut self, id: &str, new_reference: &str) -> Result<bool> {
        let Some(object) = self.objects.get(id).cloned() else {
            return Ok(false);
        };
        if object.get("path") == Some(new_reference) {
            return Ok(false);
        }

        let old_display = object.display_name();
        let old_name = object.get("name");
        let new_name = old_name.and_then(png_name_as_jpeg);
        let new_display = match (&new_name, old_name) {
            (Some(name), _) => name.clone(),
            (None, Some(name)) => name.to_string(),
            (None, None) => display_name(Path::new(new_reference)),
        };

        let body = &self.text[object.body.clone()];
        let mut new_body = replace_property(body, "path", new_reference);
        if let Some(name) = &new_name {
            new_body = replace_property(&new_body, "name", name);
        }
        for key in ["lastKnownFileType", "explicitFileType"] {
            if object.get(key).is_some_and(|t| t.starts_with("image.")) {
                new_body = replace_property(&new_body, key, "image.jpeg");
            }
        }
        self.text.replace_range(object.body.clone(), &new_body);

        if let Some(old_display) = old_display.filter(|old| *old != new_display) {
            self.rename_comments(id, &old_display, &new_display, None)?;

            let build_files: Vec<String> = self
                .order
                .iter()
                .filter(|bid| {
                    self.objects.get(*bid).is_some_and(|o| {
                        o.isa == "PBXBuildFile" && o.get("fileRef") == Some(id)
                    })
                })
                .cloned()
                .collect();
            for build_file in build_files {
                self.rename_comments(&build_file, &old_display, &new_display, Some(" in "))?;
            }
        }

        self.index()?;
        Ok(true)
    }

    /// Rewrite `ID /* old */` (or `ID /* old in Phase */`) everywhere in the file.
    fn rename_comments(
        &mut self,
        id: &str,
        old: &str,
        new: &str,
        suffix_marker: Option<&str>,
    ) -> Result<()> {
        let tail = match suffix_marker {
            Some(marker) => format!(r"({}[^*]*?\s*\*/)", regex::escape(marker)),
            None => r"(\s*\*/)".to_string(),
        };
        let pattern = format!(
            r"{}(\s*/\*\s*){}{}",
            regex::escape(id),
            regex::escape(old),
            tail
        );
        let re = Regex::new(&pattern)?;
        let replaced = re
            .replace_all(&self.text, |caps: &Captures| {
                format!("{}{}{}{}", id, &caps[1], new, &caps[2])
            })
            .into_owned();
        self.text = replaced;
        Ok(())
    }

    pub(crate) fn render(&self) -> String {
        self.text.clone()
    }
}

/// Index of the `}` closing the `{` at `open`, skipping strings and comments.
fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 1;
            }
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn strip_comments(text: &str) -> String {
    static COMMENT_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("comment regex"));
    COMMENT_RE.replace_all(text, " ").into_owned()
}

fn unquote(value: &str) -> String {
    match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) => {
            let mut out = String::with_capacity(inner.len());
            let mut chars = inner.chars();
            while let Some(c) = chars.next() {
                if c == '\\' {
                    match chars.next() {
                        Some('n') => out.push('\n'),
                        Some('t') => out.push('\t'),
                        Some(other) => out.push(other),
                        None => {}
                    }
                } else {
                    out.push(c);
                }
            }
            out
        }
        None => value.to_string(),
    }
}

/// Quote a value the way Xcode does when it contains non-identifier characters.
fn quote(value: &str) -> String {
    let bare = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '/' | ':' | '.' | '-'));
    if bare {
        value.to_string()
    } else {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{}\"", escaped)
    }
}

fn replace_property(body: &str, key: &str, value: &str) -> String {
    let pattern = format!(
        r#"(^|[\s{{;]){}(\s*=\s*)(?:"(?:[^"\\]|\\.)*"|[^;\s"(){{}}]+)(\s*;)"#,
        regex::escape(key)
    );
    match Regex::new(&pattern) {
        Ok(re) => {
            let quoted = quote(value);
            re.replacen(body, 1, |caps: &Captures| {
                format!("{}{}{}{}{}", &caps[1], key, &caps[2], quoted, &caps[3])
            })
            .into_owned()
        }
        Err(_) => body.to_string(),
    }
}

/// `Logo.png` becomes `Logo.jpg`; names without a PNG suffix are kept.
fn png_name_as_jpeg(name: &str) -> Option<String> {
    let stem_len = name.len().checked_sub(4)?;
    let (stem, suffix) = name.split_at_checked(stem_len)?;
    suffix
        .eq_ignore_ascii_case(".png")
        .then(|| format!("{}.jpg", stem))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE: &str = r#"// !$*UTF8*$!
{
	archiveVersion = 1;
	classes = {
	};
	objectVersion = 56;
	objects = {

/* Begin PBXBuildFile section */
		A10000000000000000000001 /* logo.png in Resources */ = {isa = PBXBuildFile; fileRef = B10000000000000000000001 /* logo.png */; };
		A10000000000000000000002 /* AppDelegate.swift in Sources */ = {isa = PBXBuildFile; fileRef = B10000000000000000000003 /* AppDelegate.swift */; };
/* End PBXBuildFile section */

/* Begin PBXFileReference section */
		B10000000000000000000001 /* logo.png */ = {isa = PBXFileReference; lastKnownFileType = image.png; path = logo.png; sourceTree = "<group>"; };
		B10000000000000000000002 /* Splash Screen.png */ = {isa = PBXFileReference; lastKnownFileType = image.png; name = "Splash Screen.png"; path = "Art/Splash Screen.png"; sourceTree = SOURCE_ROOT; };
		B10000000000000000000003 /* AppDelegate.swift */ = {isa = PBXFileReference; lastKnownFileType = sourcecode.swift; path = AppDelegate.swift; sourceTree = "<group>"; };
		B10000000000000000000004 /* App.app */ = {isa = PBXFileReference; explicitFileType = wrapper.application; path = App.app; sourceTree = BUILT_PRODUCTS_DIR; };
/* End PBXFileReference section */

/* Begin PBXGroup section */
		C10000000000000000000001 = {
			isa = PBXGroup;
			children = (
				C10000000000000000000002 /* App */,
				B10000000000000000000002 /* Splash Screen.png */,
			);
			sourceTree = "<group>";
		};
		C10000000000000000000002 /* App */ = {
			isa = PBXGroup;
			children = (
				B10000000000000000000001 /* logo.png */,
				B10000000000000000000003 /* AppDelegate.swift */,
			);
			path = App;
			sourceTree = "<group>";
		};
/* End PBXGroup section */

/* Begin PBXResourcesBuildPhase section */
		D10000000000000000000001 /* Resources */ = {
			isa = PBXResourcesBuildPhase;
			buildActionMask = 2147483647;
			files = (
				A10000000000000000000001 /* logo.png in Resources */,
			);
			runOnlyForDeploymentPostprocessing = 0;
		};
/* End PBXResourcesBuildPhase section */
	};
	rootObject = E10000000000000000000001 /* Project object */;
}
"#;

    fn parse() -> PbxprojFile {
        PbxprojFile::parse(Path::new("App.xcodeproj/project.pbxproj"), SAMPLE.to_string()).unwrap()
    }

    #[test]
    fn test_entries_resolve_through_groups() {
        let file = parse();
        let entries = file.entries(Path::new("/work"));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "B10000000000000000000001");
        assert_eq!(entries[0].reference, "logo.png");
        assert_eq!(entries[0].location, PathBuf::from("/work/App/logo.png"));

        assert_eq!(entries[1].reference, "Art/Splash Screen.png");
        assert_eq!(entries[1].location, PathBuf::from("/work/Art/Splash Screen.png"));
        assert_eq!(entries[1].metadata.get("name").unwrap(), "Splash Screen.png");
    }

    #[test]
    fn test_rewrite_updates_reference_and_comments() {
        let mut file = parse();
        assert!(file.rewrite("B10000000000000000000001", "logo.jpg").unwrap());
        let text = file.render();

        assert!(text.contains(
            "B10000000000000000000001 /* logo.jpg */ = {isa = PBXFileReference; lastKnownFileType = image.jpeg; path = logo.jpg; sourceTree = \"<group>\"; };"
        ));
        assert!(text.contains("A10000000000000000000001 /* logo.jpg in Resources */"));
        assert!(text.contains("fileRef = B10000000000000000000001 /* logo.jpg */;"));
        assert!(text.contains("B10000000000000000000001 /* logo.jpg */,"));
        assert!(!text.contains("logo.png"));
        assert!(text.contains("AppDelegate.swift in Sources"));
    }

    #[test]
    fn test_rewrite_quoted_name_and_path() {
        let mut file = parse();
        file.rewrite("B10000000000000000000002", "Art/Splash Screen.jpg")
            .unwrap();
        let text = file.render();

        assert!(text.contains("name = \"Splash Screen.jpg\"; path = \"Art/Splash Screen.jpg\";"));
        assert!(text.contains("B10000000000000000000002 /* Splash Screen.jpg */,"));

        let entries = file.entries(Path::new("/work"));
        assert_eq!(entries[1].reference, "Art/Splash Screen.jpg");
    }

    #[test]
    fn test_rewrite_keeps_name_without_png_suffix() {
        let text = SAMPLE
            .replace("/* logo.png", "/* Logo")
            .replace("image.png; path = logo.png;", "image.png; name = Logo; path = logo.png;");
        let mut file = PbxprojFile::parse(Path::new("App.xcodeproj/project.pbxproj"), text).unwrap();
        assert!(file.rewrite("B10000000000000000000001", "logo.jpg").unwrap());
        let text = file.render();

        assert!(text.contains("lastKnownFileType = image.jpeg; name = Logo; path = logo.jpg;"));
        assert!(text.contains("A10000000000000000000001 /* Logo in Resources */"));
        assert!(!text.contains("Logo.jpg"));
    }

    #[test]
    fn test_png_name_as_jpeg() {
        assert_eq!(png_name_as_jpeg("Splash Screen.PNG").as_deref(), Some("Splash Screen.jpg"));
        assert_eq!(png_name_as_jpeg("Logo"), None);
        assert_eq!(png_name_as_jpeg("icon.pdf"), None);
        assert_eq!(png_name_as_jpeg("png"), None);
    }

    #[test]
    fn test_rewrite_unknown_id_is_noop() {
        let mut file = parse();
        assert!(!file.rewrite("FFFFFFFFFFFFFFFFFFFFFFFF", "x.jpg").unwrap());
        assert_eq!(file.render(), SAMPLE);
    }

    #[test]
    fn test_rejects_non_project_text() {
        assert!(PbxprojFile::parse(Path::new("p"), "hello".to_string()).is_err());
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("Images/a.jpg"), "Images/a.jpg");
        assert_eq!(quote("a b.jpg"), "\"a b.jpg\"");
        assert_eq!(quote("a@2x.jpg"), "\"a@2x.jpg\"");
    }
}
