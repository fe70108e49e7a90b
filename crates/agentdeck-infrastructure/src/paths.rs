//! Unified path management for agentdeck files.
//!
//! Configuration and logs live under the platform config directory so the
//! REPL and any other front end resolve the same locations.

use agentdeck_core::error::DeckError;
use std::path::PathBuf;

const APP_DIR: &str = "agentdeck";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// The platform config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for DeckError {
    fn from(err: PathError) -> Self {
        DeckError::config(err.to_string())
    }
}

/// Unified path management for agentdeck.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/agentdeck/         # Config directory
/// ├── config.toml              # Application configuration
/// └── logs/                    # Application logs
///     └── agentdeck.log.YYYY-MM-DD
/// ```
pub struct DeckPaths;

impl DeckPaths {
    /// Returns the agentdeck configuration directory.
    ///
    /// # Returns
    ///
    /// - `Ok(PathBuf)`: Path to config directory (e.g., `~/.config/agentdeck/`)
    /// - `Err(PathError::ConfigDirNotFound)`: Could not determine directory
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::ConfigDirNotFound)
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the directory for rolling log files.
    pub fn logs_dir() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("logs"))
    }
}
