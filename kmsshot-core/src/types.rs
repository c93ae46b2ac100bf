//! Core types for kmsshot
//!
//! Descriptors for the kernel-owned buffers being captured and the results
//! of a capture run.

use serde::Serialize;
use std::path::PathBuf;

use crate::device::{GemHandle, KmsDevice};
use crate::error::{KmsshotError, Result};
use crate::formats;

/// A kernel framebuffer currently being scanned out
///
/// This is only a descriptor. The pixel memory stays owned by the kernel
/// until an exporter maps it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanoutBuffer {
    /// Framebuffer ID, used to name the output file
    pub fb_id: u32,
    /// GEM handle for the backing buffer object (0 when not visible to us)
    pub handle: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Bytes per row, including any alignment padding
    pub pitch: u32,
    /// Bits per pixel
    pub bpp: u32,
    /// Colour depth
    pub depth: u32,
}

impl ScanoutBuffer {
    /// Bytes of memory a mapping must cover: pitch * height
    pub fn required_len(&self) -> Result<usize> {
        (self.pitch as usize)
            .checked_mul(self.height as usize)
            .ok_or_else(|| {
                KmsshotError::invalid_buffer(format!(
                    "framebuffer {} size overflows ({} x {})",
                    self.fb_id, self.pitch, self.height
                ))
            })
    }

    /// Bytes of one packed RGB output row
    pub fn rgb_row_len(&self) -> usize {
        self.width as usize * formats::RGB_PIXEL_BYTES
    }

    /// Check that the buffer can be fed through the capture pipeline
    pub fn validate(&self) -> Result<()> {
        if !formats::is_supported(self.depth, self.bpp) {
            return Err(KmsshotError::UnsupportedFormat {
                fb_id: self.fb_id,
                depth: self.depth,
                bpp: self.bpp,
            });
        }

        if self.width == 0 || self.height == 0 {
            return Err(KmsshotError::invalid_buffer(format!(
                "framebuffer {} has empty size {}x{}",
                self.fb_id, self.width, self.height
            )));
        }

        let min_pitch = self.width as usize * formats::bytes_per_pixel(self.bpp) as usize;
        if (self.pitch as usize) < min_pitch {
            return Err(KmsshotError::invalid_buffer(format!(
                "framebuffer {} pitch {} is below {} bytes for width {}",
                self.fb_id, self.pitch, min_pitch, self.width
            )));
        }

        self.required_len().map(|_| ())
    }

    /// Format name for display
    pub fn format_name(&self) -> &'static str {
        formats::format_name(self.depth, self.bpp)
    }
}

/// An active display pipeline and the buffer it scans out
///
/// Owns the GEM handle GETFB created for the buffer; dropping the output
/// without capturing it closes that handle.
#[derive(Debug, Serialize)]
pub struct ResolvedOutput<'d> {
    /// Position of the CRTC in the device's resource list
    pub crtc_index: usize,
    /// CRTC object ID
    pub crtc_id: u32,
    /// The framebuffer attached to the CRTC
    pub buffer: ScanoutBuffer,
    #[serde(skip)]
    handle: Option<GemHandle<'d>>,
}

impl<'d> ResolvedOutput<'d> {
    /// Take ownership of `buffer.handle` on `device`; a zero handle is not owned
    pub fn new(
        device: &'d dyn KmsDevice,
        crtc_index: usize,
        crtc_id: u32,
        buffer: ScanoutBuffer,
    ) -> Self {
        let handle = (buffer.handle != 0).then(|| GemHandle::new(device, buffer.handle));
        Self {
            crtc_index,
            crtc_id,
            buffer,
            handle,
        }
    }

    /// Whether the framebuffer handle is held
    pub fn owns_handle(&self) -> bool {
        self.handle.is_some()
    }

    /// Split into the descriptor and the handle guard
    pub fn into_parts(self) -> (ScanoutBuffer, Option<GemHandle<'d>>) {
        (self.buffer, self.handle)
    }
}

/// Progress of a single buffer capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Framebuffer descriptor known, memory not yet mapped
    Resolved,
    /// Memory mapped read-only
    Exported,
    /// Rows are being pushed to the encoder; holds the next scanline
    Encoding(u32),
    /// Image written and mapping released
    Done,
    /// Capture abandoned, resources released
    Failed,
}

impl std::fmt::Display for CaptureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resolved => write!(f, "resolved"),
            Self::Exported => write!(f, "exported"),
            Self::Encoding(row) => write!(f, "encoding (row {})", row),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A screenshot written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub crtc_id: u32,
    pub fb_id: u32,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// A buffer that could not be captured
#[derive(Debug)]
pub struct CaptureFailure {
    pub crtc_id: u32,
    pub fb_id: u32,
    pub error: KmsshotError,
}

/// Outcome of capturing every resolved output
#[derive(Debug, Default)]
pub struct CaptureReport {
    /// Images written, in enumeration order
    pub captured: Vec<CapturedImage>,
    /// Buffers skipped because of a per-buffer error
    pub failed: Vec<CaptureFailure>,
}

impl CaptureReport {
    /// True when nothing was attempted
    pub fn is_empty(&self) -> bool {
        self.captured.is_empty() && self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(width: u32, height: u32, pitch: u32) -> ScanoutBuffer {
        ScanoutBuffer {
            fb_id: 42,
            handle: 1,
            width,
            height,
            pitch,
            bpp: 32,
            depth: 24,
        }
    }

    #[test]
    fn test_required_len() {
        assert_eq!(buffer(1920, 1080, 7680).required_len().unwrap(), 7680 * 1080);
        assert_eq!(buffer(4, 2, 64).required_len().unwrap(), 128);
    }

    #[test]
    fn test_validate_accepts_padded_pitch() {
        assert!(buffer(1366, 768, 5504).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_pitch() {
        let err = buffer(1920, 1080, 1920 * 3).validate().unwrap_err();
        assert!(matches!(err, KmsshotError::InvalidBuffer(_)));
    }

    #[test]
    fn test_validate_rejects_empty() {
        assert!(buffer(0, 1080, 0).validate().is_err());
        assert!(buffer(1920, 0, 7680).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_16bpp() {
        let mut fb = buffer(640, 480, 1280);
        fb.bpp = 16;
        fb.depth = 16;
        let err = fb.validate().unwrap_err();
        assert!(matches!(
            err,
            KmsshotError::UnsupportedFormat { bpp: 16, depth: 16, .. }
        ));
    }

    #[test]
    fn test_validate_pitch_floor_is_four_bytes_per_pixel() {
        assert!(buffer(100, 10, 400).validate().is_ok());
        let err = buffer(100, 10, 399).validate().unwrap_err();
        assert!(err.to_string().contains("below 400 bytes"), "{}", err);
    }

    #[test]
    fn test_rgb_row_len() {
        assert_eq!(buffer(4, 2, 16).rgb_row_len(), 12);
    }

    #[test]
    fn test_capture_state_display() {
        assert_eq!(CaptureState::Encoding(3).to_string(), "encoding (row 3)");
        assert_eq!(CaptureState::Failed.to_string(), "failed");
    }
}
