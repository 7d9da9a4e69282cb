//! Configuration service implementation.
//!
//! Loads [`AppConfig`] from `~/.config/sentibot/config.toml`.

use crate::paths::SentibotPaths;
use sentibot_core::config::AppConfig;
use sentibot_core::{Result, SentibotError};
use std::path::PathBuf;

/// Reads the application configuration file.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
}

impl ConfigService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a service for the default config file location.
    pub fn default_location() -> Result<Self> {
        let path = SentibotPaths::config_file()
            .map_err(|e| SentibotError::config(format!("Failed to get config file path: {}", e)))?;
        Ok(Self::new(path))
    }

    /// Loads the configuration.
    ///
    /// A missing or empty file yields the defaults. A file that exists but
    /// does not parse is an error.
    pub fn load(&self) -> Result<AppConfig> {
        if !self.path.exists() {
            tracing::debug!("No config file at {}, using defaults", self.path.display());
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(AppConfig::default());
        }

        toml::from_str(&content).map_err(|e| {
            SentibotError::config(format!(
                "Failed to parse configuration file at {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Loads the configuration, falling back to defaults on any error.
    ///
    /// The error, if any, is returned alongside so the caller can report it.
    pub fn load_or_default(&self) -> (AppConfig, Option<SentibotError>) {
        match self.load() {
            Ok(config) => (config, None),
            Err(e) => {
                tracing::warn!("Using default configuration: {}", e);
                (AppConfig::default(), Some(e))
            }
        }
    }
}
