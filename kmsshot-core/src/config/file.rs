//! Configuration file loading
//!
//! Loads user configuration from `~/.config/kmsshot/config.toml`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{default_device, default_output_dir, default_quality, CaptureConfig};
use crate::error::{KmsshotError, Result};
use crate::export::ExportStrategy;

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Capture settings
    #[serde(default)]
    pub capture: CaptureSettings,
}

/// `[capture]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// DRM device node
    #[serde(default = "default_device")]
    pub device: PathBuf,

    /// Output directory for screenshots
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// JPEG quality (1-100)
    #[serde(default = "default_quality")]
    pub quality: u8,

    /// Export strategy: auto, dumb, gem-name
    #[serde(default)]
    pub strategy: ExportStrategy,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            device: default_device(),
            output_dir: default_output_dir(),
            quality: default_quality(),
            strategy: ExportStrategy::default(),
        }
    }
}

impl ConfigFile {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("kmsshot").join("config.toml")
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("kmsshot")
                .join("config.toml")
        } else {
            PathBuf::from("/etc/kmsshot/config.toml")
        }
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| KmsshotError::config(format!("Failed to read config file: {}", e)))?;

        let config: ConfigFile = toml::from_str(&content)
            .map_err(|e| KmsshotError::config(format!("Failed to parse config file: {}", e)))?;

        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load configuration, logging warnings but returning defaults on error
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load config file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    KmsshotError::config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| KmsshotError::config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| KmsshotError::config(format!("Failed to write config file: {}", e)))?;

        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Write [`sample_config`] to `path`
    ///
    /// Returns `false` without touching an existing file unless `overwrite`
    /// is set.
    pub fn write_sample(path: impl AsRef<Path>, overwrite: bool) -> Result<bool> {
        let path = path.as_ref();
        if path.exists() && !overwrite {
            debug!("Keeping existing config file {:?}", path);
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                KmsshotError::config(format!("Failed to create config directory: {}", e))
            })?;
        }

        std::fs::write(path, sample_config())
            .map_err(|e| KmsshotError::config(format!("Failed to write config file: {}", e)))?;
        info!("Wrote sample configuration to {:?}", path);
        Ok(true)
    }

    /// Runtime configuration from the file's settings
    pub fn to_capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            device_path: self.capture.device.clone(),
            output_dir: self.capture.output_dir.clone(),
            quality: self.capture.quality,
            strategy: self.capture.strategy,
        }
    }
}

/// Generate a sample configuration file
pub fn sample_config() -> String {
    r#"# kmsshot configuration

[capture]
# DRM device node to read framebuffers from
device = "/dev/dri/card0"

# Directory screenshots are written to (screenshot-<fb id>.jpg)
output_dir = "."

# JPEG quality, 1-100
quality = 75

# How framebuffer memory is mapped:
#   "auto"     - dumb buffers if the driver supports them, GEM names otherwise
#   "dumb"     - DRM_IOCTL_MODE_MAP_DUMB on the framebuffer handle
#   "gem-name" - flink + open + i915 GTT mmap
strategy = "auto"
"#
    .to_string()
}
