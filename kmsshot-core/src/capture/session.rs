//! Capture of a single scanout buffer
//!
//! A [`CaptureSession`] owns the chosen exporter and encoder settings for a
//! device and turns each [`ResolvedOutput`] into a JPEG file. Each capture
//! moves through [`CaptureState`]; on any failure the mapping and handles
//! acquired so far are released before the error is returned.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

use crate::config::CaptureConfig;
use crate::device::{GemHandle, KmsDevice};
use crate::encode::{encode_buffer, JpegEncoder};
use crate::error::{KmsshotError, Result};
use crate::export::{select_exporter, BufferExporter};
use crate::types::{
    CaptureFailure, CaptureReport, CaptureState, CapturedImage, ResolvedOutput, ScanoutBuffer,
};

/// Captures scanout buffers of one device into JPEG files
pub struct CaptureSession<'d> {
    device: &'d dyn KmsDevice,
    exporter: Box<dyn BufferExporter>,
    encoder: JpegEncoder,
    output_dir: PathBuf,
}

impl<'d> CaptureSession<'d> {
    /// Create a session, selecting the exporter for the configured strategy
    pub fn new(device: &'d dyn KmsDevice, config: &CaptureConfig) -> Result<Self> {
        config.validate()?;
        let exporter = select_exporter(config.strategy, device);
        Ok(Self::with_exporter(device, exporter, config))
    }

    /// Create a session with an explicit exporter
    pub fn with_exporter(
        device: &'d dyn KmsDevice,
        exporter: Box<dyn BufferExporter>,
        config: &CaptureConfig,
    ) -> Self {
        Self {
            device,
            exporter,
            encoder: config.encoder(),
            output_dir: config.output_dir.clone(),
        }
    }

    /// Name of the exporter in use
    pub fn exporter_name(&self) -> &'static str {
        self.exporter.name()
    }

    /// Directory images are written to
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Capture one output into `screenshot-<fb_id>.jpg`
    ///
    /// The output's framebuffer handle is closed before this returns, on
    /// success and on every failure.
    pub fn capture(&self, output: ResolvedOutput<'d>) -> Result<CapturedImage> {
        let crtc_id = output.crtc_id;
        let (buffer, fb_handle) = output.into_parts();
        let result = self.try_capture(crtc_id, &buffer, fb_handle);
        if let Err(e) = &result {
            debug!(
                crtc_id,
                fb_id = buffer.fb_id,
                state = %CaptureState::Failed,
                "Capture abandoned: {}",
                e
            );
        }
        result
    }

    fn try_capture(
        &self,
        crtc_id: u32,
        buffer: &ScanoutBuffer,
        fb_handle: Option<GemHandle<'d>>,
    ) -> Result<CapturedImage> {
        trace!(
            crtc_id,
            fb_id = buffer.fb_id,
            handle = buffer.handle,
            state = %CaptureState::Resolved,
            "{}x{} pitch {} {}",
            buffer.width,
            buffer.height,
            buffer.pitch,
            buffer.format_name()
        );
        buffer.validate()?;

        let mapping = self.exporter.export_and_map(self.device, buffer, fb_handle)?;
        let required = buffer.required_len()?;
        if mapping.len() < required {
            return Err(KmsshotError::MappingTooSmall {
                fb_id: buffer.fb_id,
                mapped: mapping.len(),
                required,
            });
        }
        debug!(
            fb_id = buffer.fb_id,
            handle = ?mapping.handle(),
            len = mapping.len(),
            state = %CaptureState::Exported,
            "Mapped framebuffer"
        );

        let path = self.output_dir.join(CaptureConfig::file_name(buffer.fb_id));
        let file = File::create(&path).map_err(|source| KmsshotError::Output {
            path: path.clone(),
            source,
        })?;

        trace!(fb_id = buffer.fb_id, state = %CaptureState::Encoding(0), "Encoding rows");
        let writer = BufWriter::new(file);
        if let Err(e) = encode_buffer(mapping.as_slice(), buffer, &self.encoder, writer) {
            if let Err(rm) = fs::remove_file(&path) {
                warn!("Failed to remove partial image {:?}: {}", path, rm);
            }
            return Err(e);
        }
        drop(mapping);

        info!(
            crtc_id,
            fb_id = buffer.fb_id,
            state = %CaptureState::Done,
            "Wrote {}",
            path.display()
        );
        Ok(CapturedImage {
            crtc_id,
            fb_id: buffer.fb_id,
            path,
            width: buffer.width,
            height: buffer.height,
        })
    }

    /// Capture every output, isolating per-buffer failures
    pub fn capture_all(&self, outputs: Vec<ResolvedOutput<'d>>) -> CaptureReport {
        let mut report = CaptureReport::default();
        for output in outputs {
            let (crtc_id, fb_id) = (output.crtc_id, output.buffer.fb_id);
            match self.capture(output) {
                Ok(image) => report.captured.push(image),
                Err(error) => {
                    warn!(crtc_id, fb_id, "Skipping framebuffer: {}", error);
                    report.failed.push(CaptureFailure {
                        crtc_id,
                        fb_id,
                        error,
                    });
                }
            }
        }
        report
    }
}
