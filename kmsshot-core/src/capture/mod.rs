//! Screenshot capture from KMS scanout buffers
//!
//! This module handles:
//! - Enumerating CRTCs and resolving their attached framebuffers
//! - Capturing each framebuffer through a [`CaptureSession`]
//! - The one-shot run used by the command line

mod session;

pub use session::CaptureSession;

use tracing::{debug, info, warn};

use crate::config::CaptureConfig;
use crate::device::{Card, KmsDevice};
use crate::error::Result;
use crate::types::{CaptureReport, ResolvedOutput};

/// Resolve every CRTC that is scanning out a framebuffer
///
/// Only a failure to read the resource list is fatal. CRTCs without a
/// framebuffer and CRTCs whose lookup fails are skipped. Each output holds
/// the framebuffer handle the lookup created until it is dropped.
pub fn resolve_outputs<'d>(device: &'d dyn KmsDevice) -> Result<Vec<ResolvedOutput<'d>>> {
    let crtcs = device.crtc_ids()?;
    info!("There are {} CRTCs", crtcs.len());

    let mut outputs = Vec::with_capacity(crtcs.len());
    for (crtc_index, &crtc_id) in crtcs.iter().enumerate() {
        match device.scanout_buffer(crtc_id) {
            Ok(Some(buffer)) => {
                debug!(
                    crtc_index,
                    crtc_id,
                    fb_id = buffer.fb_id,
                    "CRTC {} scans out framebuffer {}",
                    crtc_id,
                    buffer.fb_id
                );
                outputs.push(ResolvedOutput::new(device, crtc_index, crtc_id, buffer));
            }
            Ok(None) => debug!(crtc_index, crtc_id, "CRTC has no framebuffer"),
            Err(e) => warn!(crtc_index, crtc_id, "Skipping CRTC: {}", e),
        }
    }
    Ok(outputs)
}

/// Capture every active output of an already opened device
pub fn run_on(device: &dyn KmsDevice, config: &CaptureConfig) -> Result<CaptureReport> {
    let session = CaptureSession::new(device, config)?;
    let outputs = resolve_outputs(device)?;
    let report = session.capture_all(outputs);
    info!(
        captured = report.captured.len(),
        failed = report.failed.len(),
        "Capture finished"
    );
    Ok(report)
}

/// Open the configured device and capture every active output
///
/// Device open and resource enumeration failures are returned as fatal
/// errors; everything else is recorded in the report.
pub fn run(config: &CaptureConfig) -> Result<CaptureReport> {
    config.validate()?;
    let card = Card::open(config.device())?;
    run_on(&card, config)
}
