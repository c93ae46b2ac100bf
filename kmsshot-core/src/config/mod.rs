//! Configuration types for kmsshot
//!
//! Provides the runtime capture configuration and the on-disk config file.

mod file;

pub use file::{sample_config, CaptureSettings, ConfigFile};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::encode::JpegEncoder;
use crate::error::{KmsshotError, Result};
use crate::export::ExportStrategy;

/// Default DRM device node
pub const DEFAULT_DEVICE: &str = "/dev/dri/card0";

/// Full capture configuration
///
/// The device path and output directory are explicit so a run can be
/// pointed at any card and any destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// DRM device node to open
    #[serde(default = "default_device")]
    pub device_path: PathBuf,
    /// Directory screenshots are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// JPEG quality (1-100)
    #[serde(default = "default_quality")]
    pub quality: u8,
    /// Buffer export strategy
    #[serde(default)]
    pub strategy: ExportStrategy,
}

pub(crate) fn default_device() -> PathBuf {
    PathBuf::from(DEFAULT_DEVICE)
}

pub(crate) fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

pub(crate) fn default_quality() -> u8 {
    JpegEncoder::DEFAULT_QUALITY
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_path: default_device(),
            output_dir: default_output_dir(),
            quality: default_quality(),
            strategy: ExportStrategy::default(),
        }
    }
}

impl CaptureConfig {
    /// Set the DRM device node
    pub fn with_device(mut self, path: impl Into<PathBuf>) -> Self {
        self.device_path = path.into();
        self
    }

    /// Set the output directory
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the JPEG quality
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// Set the export strategy
    pub fn with_strategy(mut self, strategy: ExportStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// File name for a framebuffer's screenshot
    pub fn file_name(fb_id: u32) -> String {
        format!("screenshot-{}.jpg", fb_id)
    }

    /// Full output path for a framebuffer's screenshot
    pub fn output_path(&self, fb_id: u32) -> PathBuf {
        self.output_dir.join(Self::file_name(fb_id))
    }

    /// Device path
    pub fn device(&self) -> &Path {
        &self.device_path
    }

    /// Encoder built from this configuration
    pub fn encoder(&self) -> JpegEncoder {
        JpegEncoder::new(self.quality)
    }

    /// Check settings that would otherwise fail late
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.quality) {
            return Err(KmsshotError::config(format!(
                "quality must be between 1 and 100, got {}",
                self.quality
            )));
        }
        if self.device_path.as_os_str().is_empty() {
            return Err(KmsshotError::config("device path is empty"));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(KmsshotError::config("output directory is empty"));
        }
        Ok(())
    }
}
