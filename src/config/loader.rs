// src/config/loader.rs
//! Configuration loader with discovery and validation

use crate::config::{constants::storage, SystemConfig};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Configuration loader.
///
/// Looks at the candidate paths in order and uses the first that exists;
/// without any file the defaults apply. The result is always validated.
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Loader over the standard discovery paths
    pub fn new() -> Self {
        Self {
            config_paths: Self::discover_config_paths(),
        }
    }

    /// Create loader with custom paths
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self { config_paths: paths }
    }

    pub fn config_paths(&self) -> &[PathBuf] {
        &self.config_paths
    }

    /// Load system configuration with validation
    pub fn load_system_config(&self) -> Result<SystemConfig, ConfigError> {
        match self.config_paths.iter().find(|path| path.is_file()) {
            Some(path) => Self::load_from_path(path),
            None => {
                tracing::debug!("no configuration file found, using defaults");
                let config = SystemConfig::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Load and validate one explicit file
    pub fn load_from_path(path: &Path) -> Result<SystemConfig, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: SystemConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    fn discover_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(path) = std::env::var(storage::CONFIG_ENV_VAR) {
            paths.push(PathBuf::from(path));
        }
        paths.push(PathBuf::from(storage::CONFIG_FILE_NAME));
        paths.push(Path::new("config").join(storage::CONFIG_FILE_NAME));
        paths
    }
}
