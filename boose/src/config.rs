//! `boose.toml` configuration

use crate::error::{BooseError, Result};
use crate::interp::RunOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File looked up in the working directory when no path is given
pub const CONFIG_FILE: &str = "boose.toml";

/// Whole configuration file. Every table and key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub run: RunOptions,
    pub repl: ReplOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReplOptions {
    /// History file. Relative paths are resolved against the home directory;
    /// an empty string disables history.
    pub history_file: String,
}

impl Default for ReplOptions {
    fn default() -> Self {
        ReplOptions {
            history_file: ".boose_history".to_string(),
        }
    }
}

impl ReplOptions {
    pub fn history_path(&self) -> Option<PathBuf> {
        if self.history_file.is_empty() {
            return None;
        }
        let path = PathBuf::from(&self.history_file);
        if path.is_absolute() {
            Some(path)
        } else {
            home_dir().map(|home| home.join(path))
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| BooseError::config_error(err.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| BooseError::config_error(format!("{}: {err}", path.display())))?;
        Self::from_toml(&text)
    }

    /// Load `explicit` if given, else `./boose.toml` if it exists, else defaults
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None if Path::new(CONFIG_FILE).is_file() => Self::load(Path::new(CONFIG_FILE)),
            None => Ok(Self::default()),
        }
    }
}

/// Get home directory
fn home_dir() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE").ok().map(PathBuf::from)
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOME").ok().map(PathBuf::from)
    }
}
