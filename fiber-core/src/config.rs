//! Configuration parsing and management.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

/// Per-controller configuration, read once at initialization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// Keep the bound node alive across scene loads
    #[serde(default)]
    pub persistent: bool,
}

impl Configuration {
    pub fn new(persistent: bool) -> Self {
        Self { persistent }
    }

    pub fn persists_across_scenes(&self) -> bool {
        self.persistent
    }
}

/// Context-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiberConfig {
    /// Fail construction when a declared model or view has no factory,
    /// instead of leaving the slot empty
    #[serde(default)]
    pub strict_parts: bool,

    /// Log a warning when a handler is skipped because its target is busy
    #[serde(default = "default_true")]
    pub warn_on_busy: bool,
}

fn default_true() -> bool {
    true
}

impl Default for FiberConfig {
    fn default() -> Self {
        Self {
            strict_parts: false,
            warn_on_busy: true,
        }
    }
}

impl FiberConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }
}
