//! Configuration service implementation.
//!
//! This module provides a ConfigService that loads the deck configuration
//! from the configuration file (~/.config/agentdeck/config.toml) and layers
//! environment overrides on top.

use crate::paths::DeckPaths;
use agentdeck_core::config::DeckConfig;
use agentdeck_core::error::{DeckError, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// Overrides `api.base_url`.
pub const ENV_API_URL: &str = "AGENTDECK_API_URL";
/// Overrides `api.api_key`.
pub const ENV_API_KEY: &str = "AGENTDECK_API_KEY";
/// Overrides `streaming.url` and enables streaming.
pub const ENV_WS_URL: &str = "AGENTDECK_WS_URL";

/// Configuration service that loads and caches the deck configuration.
///
/// A missing file yields defaults. A file that exists but does not parse
/// is an error rather than a silent fallback.
#[derive(Debug, Clone)]
pub struct ConfigService {
    /// Explicit config file; the platform default when `None`.
    path: Option<PathBuf>,
    config: Arc<RwLock<Option<DeckConfig>>>,
}

impl ConfigService {
    pub fn new() -> Self {
        Self {
            path: None,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Reads configuration from `path` instead of the platform default.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Gets the configuration, loading it from file if not cached.
    pub fn get_config(&self) -> Result<DeckConfig> {
        {
            let read_lock = self.config.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(ref cached) = *read_lock {
                return Ok(cached.clone());
            }
        }

        let mut loaded = Self::load_from(&self.config_path()?)?;
        apply_env_overrides(&mut loaded, |key| std::env::var(key).ok());

        {
            let mut write_lock = self.config.write().unwrap_or_else(PoisonError::into_inner);
            *write_lock = Some(loaded.clone());
        }

        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *write_lock = None;
    }

    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => Ok(DeckPaths::config_file()?),
        }
    }

    /// Parses the TOML file at `path`; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<DeckConfig> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(
                    "[ConfigService] No config at {}, using defaults",
                    path.display()
                );
                return Ok(DeckConfig::default());
            }
            Err(e) => {
                return Err(DeckError::config(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        toml::from_str(&contents).map_err(|e| DeckError::Serialization {
            format: "toml".to_string(),
            message: format!("{}: {}", path.display(), e),
        })
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies environment overrides read through `lookup`.
///
/// Blank values are ignored so an exported but empty variable does not
/// erase a configured endpoint.
pub fn apply_env_overrides(config: &mut DeckConfig, lookup: impl Fn(&str) -> Option<String>) {
    let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(url) = get(ENV_API_URL) {
        debug!("[ConfigService] {} overrides api.base_url", ENV_API_URL);
        config.api.base_url = url;
    }
    if let Some(key) = get(ENV_API_KEY) {
        config.api.api_key = Some(key);
    }
    if let Some(url) = get(ENV_WS_URL) {
        if !url.starts_with("ws://") && !url.starts_with("wss://") {
            warn!(
                "[ConfigService] {} is not a ws:// or wss:// URL: {}",
                ENV_WS_URL, url
            );
        }
        config.streaming.url = Some(url);
        config.streaming.enabled = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigService::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, DeckConfig::default());
    }

    #[test]
    fn test_load_and_cache() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[api]\nbase_url = \"https://deck.test/api\"\n\n[playground]\nsuggestion_limit = 5"
        )
        .unwrap();

        let service = ConfigService::with_path(file.path());
        let config = service.get_config().unwrap();
        assert_eq!(config.playground.suggestion_limit, 5);

        // Cached until invalidated.
        std::fs::write(file.path(), "[playground]\nsuggestion_limit = 3").unwrap();
        assert_eq!(service.get_config().unwrap().playground.suggestion_limit, 5);

        service.invalidate_cache();
        assert_eq!(service.get_config().unwrap().playground.suggestion_limit, 3);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[api\nbase_url = ").unwrap();

        let err = ConfigService::load_from(file.path()).unwrap_err();
        assert!(matches!(err, DeckError::Serialization { ref format, .. } if format == "toml"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = DeckConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                (ENV_API_URL, "https://override.test/api"),
                (ENV_API_KEY, "secret"),
                (ENV_WS_URL, "wss://override.test/ws"),
            ]),
        );

        assert_eq!(config.api.base_url, "https://override.test/api");
        assert_eq!(config.api.api_key.as_deref(), Some("secret"));
        assert_eq!(config.streaming.endpoint(), Some("wss://override.test/ws"));
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let mut config = DeckConfig::default();
        apply_env_overrides(&mut config, env(&[(ENV_API_URL, "  "), (ENV_WS_URL, "")]));

        assert_eq!(config, DeckConfig::default());
    }
}
