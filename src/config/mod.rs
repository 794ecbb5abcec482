//! Configuration management.

use crate::io::naming::Naming;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application name used for platform directories.
const APP_NAME: &str = "csvbundle";

/// Main configuration for csvbundle.
#[derive(Debug, Clone, Serialize)]
pub struct BundleConfig {
    /// Private directory for staged CSV files and finished archives.
    pub staging_dir: PathBuf,
    /// Private root under which imported archive entries are extracted.
    pub extraction_dir: PathBuf,
    /// Archive and file naming rules.
    pub naming: Naming,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Logging section of the configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Output format: "pretty" or "json".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Log file path; stderr when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Default filter directive, e.g. "info" or "csvbundle=debug".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Staging directory.
    pub staging_dir: Option<String>,
    /// Extraction directory.
    pub extraction_dir: Option<String>,
    /// Naming section.
    pub naming: Option<ConfigFileNaming>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
}

/// Naming section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileNaming {
    /// Archive name prefix.
    pub archive_prefix: Option<String>,
    /// Separator between archive date parts.
    pub date_separator: Option<String>,
    /// strftime pattern for per-file timestamps.
    pub timestamp_format: Option<String>,
}

impl Default for BundleConfig {
    fn default() -> Self {
        let data_dir = directories::ProjectDirs::from("", "", APP_NAME).map_or_else(
            || PathBuf::from(format!(".{APP_NAME}")),
            |dirs| dirs.data_dir().to_path_buf(),
        );
        Self {
            staging_dir: data_dir.join("staging"),
            extraction_dir: data_dir.join("extract"),
            naming: Naming::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl BundleConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// naming rules it sets are invalid.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: e.to_string(),
        })?;

        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for [`ConfigFile`] or
    /// the naming rules are invalid.
    pub fn from_toml(contents: &str) -> crate::Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        let config = Self::from_config_file(file);
        config.naming.validate()?;
        Ok(config)
    }

    /// Loads configuration from the default location.
    ///
    /// Looks for `config.toml` in the platform config dir. Returns default
    /// configuration if no readable config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(dirs) = directories::ProjectDirs::from("", "", APP_NAME) else {
            return Self::default();
        };

        let path = dirs.config_dir().join("config.toml");
        if path.exists() {
            match Self::load_from_file(&path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Ignoring unreadable config file"
                    );
                },
            }
        }

        Self::default()
    }

    /// Converts a `ConfigFile` to `BundleConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(dir) = file.staging_dir {
            config.staging_dir = PathBuf::from(dir);
        }
        if let Some(dir) = file.extraction_dir {
            config.extraction_dir = PathBuf::from(dir);
        }
        if let Some(naming) = file.naming {
            if let Some(prefix) = naming.archive_prefix {
                config.naming.archive_prefix = prefix;
            }
            if let Some(separator) = naming.date_separator {
                config.naming.date_separator = separator;
            }
            if let Some(format) = naming.timestamp_format {
                config.naming.timestamp_format = format;
            }
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }

        config
    }

    /// Sets the staging directory.
    #[must_use]
    pub fn with_staging_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.staging_dir = path.into();
        self
    }

    /// Sets the extraction directory.
    #[must_use]
    pub fn with_extraction_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.extraction_dir = path.into();
        self
    }
}
