//! Sorter configuration: file, then environment, then command line

use serde::{Deserialize, Serialize};
use sortline_cns::{LinkConfig, ProtocolConfig};
use sortline_core::WindowConfig;
use sortline_eye::VisionConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_PORT: &str = "SORTLINE_PORT";
pub const ENV_BAUD: &str = "SORTLINE_BAUD";
pub const ENV_CAMERA: &str = "SORTLINE_CAMERA";
pub const ENV_MODEL: &str = "SORTLINE_MODEL";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {var}: {value:?}")]
    Env { var: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Everything the sorter needs, grouped by crate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SorterConfig {
    pub window: WindowConfig,
    pub link: LinkConfig,
    pub protocol: ProtocolConfig,
    pub vision: VisionConfig,
}

impl SorterConfig {
    /// Read a TOML file. Missing sections and keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// File (or defaults), then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Apply `SORTLINE_*` overrides using `lookup` to read variables
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(ENV_PORT) {
            self.link.port = port;
        }

        if let Some(baud) = lookup(ENV_BAUD) {
            self.link.baud_rate = baud
                .trim()
                .parse()
                .map_err(|_| ConfigError::Env { var: ENV_BAUD, value: baud })?;
        }

        if let Some(camera) = lookup(ENV_CAMERA) {
            self.vision.camera_id = camera
                .trim()
                .parse()
                .map_err(|_| ConfigError::Env { var: ENV_CAMERA, value: camera })?;
        }

        if let Some(model) = lookup(ENV_MODEL) {
            self.vision.model_path = PathBuf::from(model);
        }

        Ok(())
    }

    /// Validate each section, then the cross-section constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.window
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("[window] {}", e)))?;
        self.link
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("[link] {}", e)))?;
        self.protocol
            .validate_against(self.window.num_classes)
            .map_err(|e| ConfigError::Invalid(format!("[protocol] {}", e)))?;
        self.vision
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("[vision] {}", e)))?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
