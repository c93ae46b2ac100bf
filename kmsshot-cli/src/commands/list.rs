//! List command - show active CRTCs and their framebuffers

use anyhow::{Context, Result};
use clap::Args;
use kmsshot_core::capture::resolve_outputs;
use kmsshot_core::config::{CaptureConfig, ConfigFile};
use kmsshot_core::device::{list_devices, Card, KmsDevice};
use kmsshot_core::types::ResolvedOutput;
use serde::Serialize;
use std::path::PathBuf;

/// Arguments for the list command
#[derive(Args)]
pub struct ListArgs {
    /// DRM device node (defaults to the configured device)
    #[arg(short, long)]
    device: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct DeviceListing<'d> {
    device: PathBuf,
    driver: Option<String>,
    dumb_buffers: bool,
    // Dropping the outputs closes their framebuffer handles.
    outputs: Vec<ResolvedOutput<'d>>,
}

/// List active outputs without mapping any buffer
pub fn list(args: ListArgs) -> Result<()> {
    let config: CaptureConfig = ConfigFile::load_or_default().to_capture_config();
    let path = args.device.unwrap_or(config.device_path);

    let card = Card::open(&path)?;
    let listing = DeviceListing {
        driver: card.driver_name().ok(),
        dumb_buffers: card.supports_dumb_buffers(),
        outputs: resolve_outputs(&card)?,
        device: path,
    };

    if args.json {
        let json = serde_json::to_string_pretty(&listing).context("Failed to serialize listing")?;
        println!("{}", json);
        return Ok(());
    }

    println!("kmsshot - {}\n", listing.device.display());
    println!("  Driver:       {}", listing.driver.as_deref().unwrap_or("unknown"));
    println!(
        "  Dumb buffers: {}",
        if listing.dumb_buffers { "supported" } else { "not supported" }
    );
    println!();

    if listing.outputs.is_empty() {
        println!("No active CRTCs found.");
        let others: Vec<PathBuf> = list_devices()
            .into_iter()
            .filter(|d| *d != listing.device)
            .collect();
        if !others.is_empty() {
            println!("\nOther DRM devices:");
            for other in others {
                println!("  {}", other.display());
            }
        }
        return Ok(());
    }

    println!(
        "{:<6} {:<8} {:<8} {:<12} {:<8} {:<10} {:<8}",
        "Index", "CRTC", "FB", "Size", "Pitch", "Depth/BPP", "Format"
    );
    println!("{}", "-".repeat(66));

    for output in &listing.outputs {
        let fb = &output.buffer;
        println!(
            "{:<6} {:<8} {:<8} {:<12} {:<8} {:<10} {:<8}",
            output.crtc_index,
            output.crtc_id,
            fb.fb_id,
            format!("{}x{}", fb.width, fb.height),
            fb.pitch,
            format!("{}/{}", fb.depth, fb.bpp),
            fb.format_name()
        );
    }

    Ok(())
}
