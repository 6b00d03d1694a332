//! blepush CLI Configuration Management
//!
//! Configuration is layered with the priority CLI flags > config file >
//! defaults. The file is TOML with one table per concern:
//!
//! - `[session]` - timeouts, chunking and GATT identifiers
//! - `[ble]` - adapter selection and write mode
//! - `[image]` - where the payload comes from

use std::path::{Path, PathBuf};

use blepush_ble::BleTransportConfig;
use blepush_core::{Acquisition, FileImageSource, ImageFormat, SessionConfig};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

// ----------------------------------------------------------------------------
// Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the blepush CLI
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub session: SessionConfig,
    pub ble: BleTransportConfig,
    pub image: ImageConfig,
}

/// Where the payload is read from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub format: ImageFormat,
}

impl AppConfig {
    /// Load configuration from a TOML file; missing keys keep their defaults
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::Loading(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(ms) = cli.scan_timeout_ms {
            self.session.scan_timeout_ms = ms;
        }
        if let Some(ms) = cli.connect_timeout_ms {
            self.session.connect_timeout_ms = ms;
        }
        if let Some(size) = cli.chunk_size {
            self.session.chunk_size = size;
        }
        if let Some(size) = cli.payload_size {
            self.session.payload_size = size;
        }
        if cli.no_scan {
            self.session.acquisition = Acquisition::Known;
        }
        if let Some(path) = &cli.image {
            self.image.path = Some(path.clone());
        }
        if let Some(format) = cli.format {
            self.image.format = format.into();
        }
        if let Some(index) = cli.adapter {
            self.ble.adapter_index = index;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        if self.image.path.is_none() {
            return Err(ConfigError::Validation(
                "No image configured; pass --image or set image.path".to_string(),
            ));
        }
        Ok(())
    }

    /// Image source for the configured file
    pub fn image_source(&self) -> Result<FileImageSource, ConfigError> {
        let path = self.image.path.as_ref().ok_or_else(|| {
            ConfigError::Validation("No image configured".to_string())
        })?;
        Ok(FileImageSource::new(
            path.clone(),
            self.image.format,
            self.session.payload_size,
        ))
    }
}

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    Loading(String),

    #[error("Configuration parsing failed: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Configuration validation failed: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),
}
