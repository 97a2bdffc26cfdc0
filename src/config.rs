//! Configuration file and environment overrides.
//!
//! Looked up in this order, later sources winning:
//! built-in defaults, `--config <file>` (or `./sitecheck.toml` when present),
//! then `SITECHECK_*` environment variables and `NO_COLOR`.
//!
//! ```toml
//! profile_dirs = ["/etc/sitecheck/profiles"]
//! default_format = "console"
//! color = true
//! log_format = "compact"
//! ```

use crate::logging::LogFormat;
use crate::{Format, Result, SiteCheckError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "sitecheck.toml";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Extra directories of `*.toml` profile files
    pub profile_dirs: Vec<PathBuf>,
    /// Format used when `--format` is not given
    pub default_format: String,
    /// Colour console reports written to a terminal
    pub color: bool,
    /// Format of log lines on stderr
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile_dirs: Vec::new(),
            default_format: Format::Console.as_str().to_string(),
            color: true,
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SiteCheckError::Config(format!("failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| SiteCheckError::Config(format!("failed to parse config: {}", e)))
    }

    /// Load from `path`, or from `./sitecheck.toml` when it exists, then
    /// apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Self::from_file(DEFAULT_CONFIG_FILE)?,
            None => Self::default(),
        };
        config.merge_env()
    }

    /// Merge with environment variables (SITECHECK_ prefix)
    pub fn merge_env(self) -> Result<Self> {
        self.merge_env_from(|key| std::env::var(key).ok())
    }

    /// Merge overrides read through `lookup`.
    pub fn merge_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(val) = lookup("SITECHECK_PROFILE_DIRS") {
            self.profile_dirs
                .extend(std::env::split_paths(&val).filter(|p| !p.as_os_str().is_empty()));
        }
        if let Some(val) = lookup("SITECHECK_FORMAT") {
            self.default_format = val;
        }
        if let Some(val) = lookup("SITECHECK_LOG_FORMAT") {
            self.log_format = val.parse()?;
        }
        // Any value disables colour, per no-color.org.
        if lookup("NO_COLOR").is_some() {
            self.color = false;
        }
        Ok(self)
    }
}
