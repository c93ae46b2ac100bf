//! Line-oriented JPEG encoder
//!
//! Rows are handed to libjpeg one scanline at a time and compressed as they
//! arrive, so only the codec's own row-group buffers are held. Output is
//! baseline RGB JPEG with standard Huffman tables.

use mozjpeg::compress::CompressStarted;
use mozjpeg::{ColorSpace, Compress};
use std::io::Write;
use tracing::debug;

use crate::error::{KmsshotError, Result};
use crate::formats::RGB_PIXEL_BYTES;

/// Largest dimension a baseline JPEG can describe
pub const MAX_DIMENSION: u32 = u16::MAX as u32;

/// JPEG encoder settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegEncoder {
    quality: u8,
}

impl Default for JpegEncoder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_QUALITY)
    }
}

impl JpegEncoder {
    /// Quality used for screenshots
    pub const DEFAULT_QUALITY: u8 = 75;

    /// Create an encoder; quality is clamped to 1..=100
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    /// Configured quality
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Start a compression stream of `width` x `height` RGB pixels into `writer`
    ///
    /// The JPEG header is produced here; compressed data reaches `writer`
    /// while rows are still being written.
    pub fn begin<W: Write>(
        &self,
        writer: W,
        width: u32,
        height: u32,
    ) -> Result<EncodeSession<W>> {
        if width == 0 || height == 0 {
            return Err(KmsshotError::encoder(format!(
                "cannot encode an empty {}x{} image",
                width, height
            )));
        }
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(KmsshotError::encoder(format!(
                "{}x{} exceeds the JPEG limit of {} pixels per side",
                width, height, MAX_DIMENSION
            )));
        }

        let mut compress = Compress::new(ColorSpace::JCS_RGB);
        // Baseline, single pass: progressive or optimized output would make
        // libjpeg buffer the whole image.
        compress.set_fastest_defaults();
        compress.set_optimize_coding(false);
        compress.set_size(width as usize, height as usize);
        compress.set_quality(f32::from(self.quality));

        let stream = compress.start_compress(writer).map_err(|e| {
            KmsshotError::encoder(format!("failed to start JPEG stream: {}", e))
        })?;
        debug!(width, height, quality = self.quality, "Starting JPEG stream");

        Ok(EncodeSession {
            stream,
            width,
            height,
            next_scanline: 0,
            row_len: width as usize * RGB_PIXEL_BYTES,
        })
    }
}

/// An in-progress compression stream for one image
///
/// Owned by a single capture; it cannot be restarted once finished.
pub struct EncodeSession<W: Write> {
    stream: CompressStarted<W>,
    width: u32,
    height: u32,
    next_scanline: u32,
    row_len: usize,
}

impl<W: Write> EncodeSession<W> {
    /// Compress the next scanline
    ///
    /// Errors come from the underlying writer or codec.
    ///
    /// # Panics
    ///
    /// If `row` is not exactly `width * 3` bytes, or if all `height` rows
    /// have already been written. Either would corrupt the rest of the stream.
    pub fn write_row(&mut self, row: &[u8]) -> Result<()> {
        assert_eq!(
            row.len(),
            self.row_len,
            "JPEG row must be {} bytes for width {}",
            self.row_len,
            self.width
        );
        assert!(
            self.next_scanline < self.height,
            "JPEG stream already holds all {} rows",
            self.height
        );

        self.stream.write_scanlines(row)?;
        self.next_scanline += 1;
        Ok(())
    }

    /// Index of the next row to be written
    pub fn next_scanline(&self) -> u32 {
        self.next_scanline
    }

    /// Image dimensions
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Write the trailer, flush and hand back the writer
    pub fn finish(self) -> Result<W> {
        if self.next_scanline != self.height {
            return Err(KmsshotError::encoder(format!(
                "stream finished after {} of {} rows",
                self.next_scanline, self.height
            )));
        }

        let mut writer = self.stream.finish()?;
        writer.flush()?;

        debug!(width = self.width, height = self.height, "JPEG stream finished");
        Ok(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_clamped() {
        assert_eq!(JpegEncoder::new(0).quality(), 1);
        assert_eq!(JpegEncoder::new(250).quality(), 100);
        assert_eq!(JpegEncoder::default().quality(), 75);
    }

    #[test]
    fn test_begin_rejects_empty() {
        assert!(JpegEncoder::default().begin(Vec::new(), 0, 10).is_err());
        assert!(JpegEncoder::default().begin(Vec::new(), 10, 0).is_err());
    }

    #[test]
    fn test_begin_rejects_oversized() {
        assert!(JpegEncoder::default().begin(Vec::new(), 70_000, 10).is_err());
    }

    #[test]
    fn test_produces_jpeg_markers() {
        let mut session = JpegEncoder::default().begin(Vec::new(), 2, 2).unwrap();
        session.write_row(&[255, 0, 0, 0, 255, 0]).unwrap();
        session.write_row(&[0, 0, 255, 255, 255, 255]).unwrap();
        assert_eq!(session.next_scanline(), 2);

        let data = session.finish().unwrap();
        assert_eq!(&data[..2], &[0xFF, 0xD8]);
        assert_eq!(&data[data.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_output_is_baseline() {
        let mut session = JpegEncoder::default().begin(Vec::new(), 16, 16).unwrap();
        for _ in 0..16 {
            session.write_row(&[90; 48]).unwrap();
        }
        let data = session.finish().unwrap();

        let has_marker = |marker: u8| data.windows(2).any(|w| w == [0xFF, marker]);
        assert!(has_marker(0xC0), "expected a baseline SOF0 frame header");
        assert!(!has_marker(0xC2), "progressive SOF2 frame header found");
    }

    #[test]
    fn test_finish_requires_all_rows() {
        let mut session = JpegEncoder::default().begin(Vec::new(), 2, 3).unwrap();
        session.write_row(&[0; 6]).unwrap();
        let err = session.finish().unwrap_err();
        assert!(err.to_string().contains("1 of 3 rows"));
    }

    #[test]
    #[should_panic(expected = "JPEG row must be 6 bytes")]
    fn test_wrong_row_length_panics() {
        let mut session = JpegEncoder::default().begin(Vec::new(), 2, 2).unwrap();
        let _ = session.write_row(&[0; 8]);
    }

    #[test]
    #[should_panic(expected = "already holds all 1 rows")]
    fn test_extra_row_panics() {
        let mut session = JpegEncoder::default().begin(Vec::new(), 1, 1).unwrap();
        session.write_row(&[0; 3]).unwrap();
        let _ = session.write_row(&[0; 3]);
    }
}
