// Configuration management for spintags

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::index::IndexError;
use crate::indexer::{IndexSettings, ParseMode};

/// Name of the per-project configuration file.
pub const CONFIG_FILE: &str = ".spintags.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub library: LibraryConfig,
    pub parse: ParseConfig,
    pub ctags: CtagsConfig,
    pub logging: LoggingConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Directory searched for objects not found next to their referrer.
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseConfig {
    pub mode: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CtagsConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub file: String,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            mode: ParseMode::default().as_str().to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            file: ".spintags.db".to_string(),
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub library: Option<String>,
    pub mode: Option<String>,
    pub ctags: bool,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, IndexError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content).map_err(|e| IndexError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from project directory
    /// Looks for .spintags.toml in the project root
    pub fn from_project_dir<P: AsRef<Path>>(project_dir: P) -> Self {
        let config_path = project_dir.as_ref().join(CONFIG_FILE);

        match Self::from_file(&config_path) {
            Ok(config) => {
                tracing::info!("Loaded configuration from {}", config_path.display());
                config
            }
            Err(e) => {
                tracing::debug!("Could not load config from {}: {}", config_path.display(), e);
                Self::default()
            }
        }
    }

    /// Configuration for a root source file, read from its directory.
    pub fn for_root(root: &Path) -> Self {
        Self::from_project_dir(project_dir(root))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), IndexError> {
        ParseMode::from_str(&self.parse.mode).map_err(|e| IndexError::Config(e.to_string()))?;

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(IndexError::Config(format!("Invalid log level: {}", self.logging.level)));
        }
        let valid_formats = ["compact", "pretty"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(IndexError::Config(format!("Invalid log format: {}", self.logging.format)));
        }

        if self.store.file.trim().is_empty() {
            return Err(IndexError::Config("Store file name cannot be empty".to_string()));
        }

        Ok(())
    }

    /// Settings for indexing `root`, with command-line overrides applied.
    /// Relative library and store paths are taken from the root's directory.
    pub fn index_settings(&self, root: &Path, overrides: &Overrides) -> anyhow::Result<IndexSettings> {
        let dir = project_dir(root);

        let library = overrides.library.as_deref().unwrap_or(&self.library.path);
        let library = if library.is_empty() {
            PathBuf::new()
        } else {
            dir.join(library)
        };

        let mode = ParseMode::from_str(overrides.mode.as_deref().unwrap_or(&self.parse.mode))?;

        Ok(IndexSettings {
            root: root.to_path_buf(),
            library,
            mode,
            ctags: overrides.ctags || self.ctags.enabled,
            store_path: dir.join(&self.store.file),
        })
    }
}

/// Directory holding `root`, `.` for a bare file name.
pub fn project_dir(root: &Path) -> PathBuf {
    match root.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.library.path, "");
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.store.file, ".spintags.db");
        assert!(!config.ctags.enabled);
        assert!(config.validate().is_ok());
    }

    #[cfg(feature = "autocomplete")]
    #[test]
    fn test_default_mode_is_full() {
        assert_eq!(Config::default().parse.mode, "full");
    }

    #[test]
    fn test_partial_file() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "[library]\npath = \"lib\"\n\n[parse]\nmode = \"tree\"\n",
        )
        .unwrap();

        let config = Config::from_project_dir(dir.path());
        assert_eq!(config.library.path, "lib");
        assert_eq!(config.parse.mode, "tree");
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[parse]\nmode = \"fast\"\n").unwrap();
        assert_eq!(Config::from_project_dir(dir.path()), Config::default());

        fs::write(dir.path().join(CONFIG_FILE), "not toml at all [").unwrap();
        assert!(matches!(
            Config::from_file(dir.path().join(CONFIG_FILE)),
            Err(IndexError::Config(_))
        ));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.parse.mode = "everything".to_string();
        assert!(config.validate().is_err());
        config.parse.mode = "tree".to_string();

        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
        config.logging.level = "debug".to_string();

        config.logging.format = "json".to_string();
        assert!(config.validate().is_err());
        config.logging.format = "pretty".to_string();

        config.store.file = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_index_settings_resolve_paths() {
        let mut config = Config::default();
        config.library.path = "lib".to_string();
        config.parse.mode = "full".to_string();

        let settings = config
            .index_settings(Path::new("project/top.spin"), &Overrides::default())
            .unwrap();
        assert_eq!(settings.library, PathBuf::from("project/lib"));
        assert_eq!(settings.store_path, PathBuf::from("project/.spintags.db"));
        assert_eq!(settings.mode, ParseMode::Full);
        assert!(!settings.ctags);

        let settings = config
            .index_settings(Path::new("top.spin"), &Overrides::default())
            .unwrap();
        assert_eq!(settings.store_path, PathBuf::from("./.spintags.db"));
    }

    #[test]
    fn test_overrides_win() {
        let config = Config::default();
        let overrides = Overrides {
            library: Some("/opt/propeller/lib".to_string()),
            mode: Some("tree".to_string()),
            ctags: true,
        };

        let settings = config.index_settings(Path::new("top.spin"), &overrides).unwrap();
        assert_eq!(settings.library, PathBuf::from("/opt/propeller/lib"));
        assert_eq!(settings.mode, ParseMode::TreeOnly);
        assert!(settings.ctags);

        let bad = Overrides {
            mode: Some("fast".to_string()),
            ..Overrides::default()
        };
        assert!(config.index_settings(Path::new("top.spin"), &bad).is_err());
    }
}
