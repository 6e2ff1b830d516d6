//! Project configuration file support for logtally.
//!
//! Loads `logtally.toml` from the working directory, falling back to the
//! user config directory (`~/.config/logtally/logtally.toml` on Linux).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// The config file name
pub const CONFIG_FILE_NAME: &str = "logtally.toml";

pub const DEFAULT_LOG_DIR: &str = "./logs";
pub const DEFAULT_EXTENSION: &str = "log";

/// Project-level configuration loaded from `logtally.toml`
#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Directory holding one log file per service
    pub log_dir: Option<PathBuf>,
    /// Log file extension, without the dot
    pub extension: Option<String>,
    /// Diagnostic log format (pretty, json, compact)
    pub log_format: Option<String>,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub filters: FilterConfig,
}

/// Detail level of the text report
#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    #[serde(default)]
    pub success_details: bool,
    #[serde(default)]
    pub error_details: bool,
}

/// Default reason-tag filters
#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    pub success: Option<String>,
    pub error: Option<String>,
}

impl ProjectConfig {
    /// Load configuration from the working directory, then the user config dir.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if a file exists and parses successfully
    /// - `Ok(None)` if no file exists
    /// - `Err(...)` if a file exists but fails to parse (hard error)
    pub fn discover(working_dir: &Path) -> Result<Option<Self>> {
        let local = working_dir.join(CONFIG_FILE_NAME);
        if local.exists() {
            return Self::load(&local).map(Some);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user = config_dir.join("logtally").join(CONFIG_FILE_NAME);
            if user.exists() {
                return Self::load(&user).map(Some);
            }
        }

        Ok(None)
    }

    /// Load a specific config file. A missing file is an error here.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Priority: flag > config file > `./logs`
    pub fn log_dir(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.log_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR))
    }

    /// Priority: flag > config file > `log`
    pub fn extension<'a>(&'a self, flag: Option<&'a str>) -> &'a str {
        flag.or(self.extension.as_deref())
            .unwrap_or(DEFAULT_EXTENSION)
    }

    /// Priority: flag > config file > none
    pub fn success_filter<'a>(&'a self, flag: Option<&'a str>) -> Option<&'a str> {
        flag.or(self.filters.success.as_deref())
    }

    /// Priority: flag > config file > none
    pub fn error_filter<'a>(&'a self, flag: Option<&'a str>) -> Option<&'a str> {
        flag.or(self.filters.error.as_deref())
    }
}
