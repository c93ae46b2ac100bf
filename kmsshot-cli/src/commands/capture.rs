//! Capture command - screenshot every active CRTC

use anyhow::{anyhow, Context, Result};
use clap::Args;
use kmsshot_core::capture;
use kmsshot_core::config::{CaptureConfig, ConfigFile};
use kmsshot_core::export::ExportStrategy;
use std::path::PathBuf;
use tracing::{debug, info};

/// Arguments for the capture command
#[derive(Args, Default)]
pub struct CaptureArgs {
    /// DRM device node
    #[arg(short, long)]
    device: Option<PathBuf>,

    /// Directory to write screenshot-<fb id>.jpg files to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// JPEG quality (1-100)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,

    /// Buffer export strategy (auto, dumb, gem-name)
    #[arg(short, long)]
    strategy: Option<String>,

    /// Config file to read instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl CaptureArgs {
    /// File settings overridden by any flags given
    fn resolve(&self) -> Result<CaptureConfig> {
        let file = match &self.config {
            Some(path) => {
                if !path.exists() {
                    return Err(anyhow!("Config file not found: {}", path.display()));
                }
                ConfigFile::load_from(path).context("Failed to load config file")?
            }
            None => ConfigFile::load_or_default(),
        };

        let mut config = file.to_capture_config();
        if let Some(device) = &self.device {
            config = config.with_device(device);
        }
        if let Some(dir) = &self.output_dir {
            config = config.with_output_dir(dir);
        }
        if let Some(quality) = self.quality {
            config = config.with_quality(quality);
        }
        if let Some(strategy) = &self.strategy {
            let strategy: ExportStrategy = strategy.parse().map_err(|_| {
                anyhow!(
                    "Invalid strategy '{}'. Valid options: auto, dumb, gem-name",
                    strategy
                )
            })?;
            config = config.with_strategy(strategy);
        }

        config.validate()?;
        Ok(config)
    }
}

/// Capture every active output
pub fn capture(args: CaptureArgs) -> Result<()> {
    let config = args.resolve()?;
    debug!(?config, "Resolved capture configuration");

    let report = capture::run(&config)?;

    for image in &report.captured {
        println!("{}", image.path.display());
    }
    for failure in &report.failed {
        eprintln!(
            "Skipped framebuffer {} on CRTC {}: {}",
            failure.fb_id, failure.crtc_id, failure.error
        );
        if let Some(hint) = failure.error.user_hint() {
            eprintln!("  Hint: {}", hint);
        }
    }

    if report.is_empty() {
        info!("No active CRTCs on {}", config.device_path.display());
    }
    Ok(())
}
