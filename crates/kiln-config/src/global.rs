//! Global Configuration (~/.kiln/config.toml)
//!
//! Handles user-level defaults stored in `~/.kiln/config.toml`.

use crate::platform::{Compiler, Flavor};
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global user configuration from ~/.kiln/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Default settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,
}

/// Default settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct DefaultsConfig {
    /// Default compiler family
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler: Option<Compiler>,

    /// Default build flavor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flavor: Option<Flavor>,

    /// Default number of parallel compile jobs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
}

impl GlobalConfig {
    /// Load global configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load the global configuration, or defaults if the file does not exist
    pub fn load_or_default() -> ConfigResult<Self> {
        let path = Self::global_config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from_file(&path)
    }

    /// Validate the global configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.default_jobs() == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "defaults.jobs".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Get the global config file path (~/.kiln/config.toml)
    pub fn global_config_path() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".kiln").join("config.toml"))
    }

    pub fn default_compiler(&self) -> Option<Compiler> {
        self.defaults.as_ref().and_then(|d| d.compiler)
    }

    pub fn default_flavor(&self) -> Option<Flavor> {
        self.defaults.as_ref().and_then(|d| d.flavor)
    }

    pub fn default_jobs(&self) -> Option<usize> {
        self.defaults.as_ref().and_then(|d| d.jobs)
    }
}
