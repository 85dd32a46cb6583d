//! Run configuration and fatal configuration errors.
//!
//! Defaults for a mapping run can be kept in a TOML file so they don't have
//! to be repeated on every invocation. Command-line flags can only switch a
//! setting on, never off.
//!
//! # Configuration File Format
//!
//! ```toml
//! [mapping]
//! overwrite = false
//! strict = false
//!
//! [output]
//! color = true
//! progress = false
//! quiet = false
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Errors that abort a run before any file is touched.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    ConfigInvalid(String),
    /// The JSON mapping file does not exist.
    MappingNotFound(PathBuf),
    /// The JSON mapping file is not an object of string to string.
    MappingInvalid {
        /// The mapping file that failed to load.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },
    /// The `key=value,...` template string could not be parsed.
    InvalidTemplate(String),
    /// The source root is missing or not a directory.
    InvalidSourceRoot(PathBuf),
    /// The destination root exists but is not a directory, or cannot be created.
    InvalidDestinationRoot {
        path: PathBuf,
        reason: String,
    },
    /// IO error while reading configuration or mapping input.
    IoError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ConfigNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::ConfigInvalid(msg) => write!(f, "Invalid configuration: {}", msg),
            ConfigError::MappingNotFound(path) => {
                write!(f, "Mapping file not found: {}", path.display())
            }
            ConfigError::MappingInvalid { path, reason } => {
                write!(f, "Invalid mapping file {}: {}", path.display(), reason)
            }
            ConfigError::InvalidTemplate(msg) => write!(f, "Invalid template string: {}", msg),
            ConfigError::InvalidSourceRoot(path) => {
                write!(
                    f,
                    "Source path {} does not exist or is not a directory",
                    path.display()
                )
            }
            ConfigError::InvalidDestinationRoot { path, reason } => {
                write!(f, "Invalid destination path {}: {}", path.display(), reason)
            }
            ConfigError::IoError(msg) => write!(f, "IO error reading input: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Defaults for a mapping run, deserialized from TOML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapperConfig {
    #[serde(default)]
    pub mapping: MappingSettings,

    #[serde(default)]
    pub output: OutputSettings,
}

/// Settings that change how entries are realized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingSettings {
    /// Replace destinations that already existed before the run.
    #[serde(default)]
    pub overwrite: bool,

    /// Exit with a non-zero status when any entry is skipped or fails.
    #[serde(default)]
    pub strict: bool,
}

/// Settings for console output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Use ANSI colors. Defaults to true.
    #[serde(default = "default_color")]
    pub color: bool,

    /// Show a progress bar over the mapping entries.
    #[serde(default)]
    pub progress: bool,

    /// Only print warnings, errors and the summary.
    #[serde(default)]
    pub quiet: bool,
}

fn default_color() -> bool {
    true
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            color: default_color(),
            progress: false,
            quiet: false,
        }
    }
}

impl MapperConfig {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.filemapperrc.toml` in the current directory
    /// 3. Look for `~/.config/filemapper/config.toml` in home directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but cannot be read,
    /// or if any file found is not valid TOML.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(".filemapperrc.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("filemapper")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigNotFound` if file does not exist.
    /// Returns `ConfigError::ConfigInvalid` if TOML parsing fails.
    /// Returns `ConfigError::IoError` if file cannot be read.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }
}
