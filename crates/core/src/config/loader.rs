//! Configuration file loading

use super::schema::ConfigSchema;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// File names looked up in the project root when no path is given
pub const CONFIG_FILE_NAMES: &[&str] = &[".xcode-png-optim.toml", "xcode-png-optim.toml"];

/// Configuration wrapper
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub schema: ConfigSchema,
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from an explicit path, or from the project root, or use defaults
    pub fn load(project_root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let config_path = match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(Error::config_not_found(path));
                }
                Some(path.to_path_buf())
            }
            None => find_config_file(project_root),
        };

        let schema = match &config_path {
            Some(p) => load_config_file(p)?,
            None => ConfigSchema::default(),
        };
        schema.validate()?;

        Ok(Self {
            schema,
            path: config_path,
        })
    }
}

/// Find configuration file in standard locations
fn find_config_file(project_root: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| project_root.join(name))
        .find(|candidate| candidate.is_file())
}

/// Load and parse a TOML configuration file
fn load_config_file(path: &Path) -> Result<ConfigSchema> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    toml::from_str(&content).map_err(|e| {
        Error::from(e).with_context(format!("While reading {}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.path.is_none());
        assert_eq!(config.schema.conversion.quality, 85);
    }

    #[test]
    fn test_config_load_without_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path(), None).unwrap();
        assert!(config.path.is_none());
    }

    #[test]
    fn test_config_found_in_project_root() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(".xcode-png-optim.toml"),
            "[conversion]\nquality = 70\n",
        )
        .unwrap();

        let config = Config::load(dir.path(), None).unwrap();
        assert_eq!(config.schema.conversion.quality, 70);
        assert!(config.path.is_some());
    }

    #[test]
    fn test_explicit_missing_config() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(dir.path(), Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigNotFound);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[conversion]\nquality = 101\n").unwrap();

        let err = Config::load(dir.path(), Some(&path)).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfigValue);
    }

    #[test]
    fn test_malformed_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[conversion\nquality = ").unwrap();

        let err = Config::load(dir.path(), Some(&path)).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigParseError);
    }
}
