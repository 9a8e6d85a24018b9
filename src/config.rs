use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::log::LogLevel;
use crate::util::expand_tilde;
use crate::{rig_debug, Error, Result};

/// User-level settings from `~/.buildrig/buildrig.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Color status lines. Defaults to on.
    pub color: Option<bool>,
    /// Bundler program used by `bundle` steps that don't name one.
    pub bundler: Option<String>,
    /// Diagnostic log location.
    pub log_file: Option<String>,
    /// Diagnostic log level.
    pub log_level: Option<LogLevel>,
}

impl Config {
    pub fn rig_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".buildrig"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::rig_dir()?.join("buildrig.toml"))
    }

    pub fn effective_color(&self) -> bool {
        self.color.unwrap_or(true)
    }

    pub fn effective_bundler(&self) -> &str {
        self.bundler.as_deref().unwrap_or("webpack")
    }

    pub fn effective_log_file(&self) -> Option<PathBuf> {
        self.log_file.as_deref().map(expand_tilde)
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        rig_debug!("Config::load path={}", path.display());
        if !path.exists() {
            rig_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::from_toml(&fs::read_to_string(&path)?)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        rig_debug!(
            "Config loaded: color={:?}, bundler={:?}, log_file={:?}",
            config.color,
            config.bundler,
            config.log_file
        );
        Ok(config)
    }
}
