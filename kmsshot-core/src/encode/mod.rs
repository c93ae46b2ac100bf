//! Pixel conversion and JPEG encoding
//!
//! This module provides:
//! - Reverse-order conversion of padded 32-bit rows into packed RGB
//! - A scanline-at-a-time JPEG encoder
//! - The row pump that feeds one mapped framebuffer through both

mod convert;
mod jpeg;

pub use convert::{convert_row, convert_row_with_order, convert_within, ByteOrder};
pub use jpeg::{EncodeSession, JpegEncoder, MAX_DIMENSION};

use std::io::Write;
use tracing::trace;

use crate::error::{KmsshotError, Result};
use crate::formats::{RGB_PIXEL_BYTES, SOURCE_PIXEL_BYTES};
use crate::types::ScanoutBuffer;

/// Encode a whole framebuffer from its mapped bytes
///
/// `pixels` must cover `pitch * height` bytes. Rows are read at
/// `row * pitch`, converted into one reused scratch row and written in
/// scanline order.
pub fn encode_buffer<W: Write>(
    pixels: &[u8],
    buffer: &ScanoutBuffer,
    encoder: &JpegEncoder,
    writer: W,
) -> Result<W> {
    buffer.validate()?;
    let required = buffer.required_len()?;
    if pixels.len() < required {
        return Err(KmsshotError::MappingTooSmall {
            fb_id: buffer.fb_id,
            mapped: pixels.len(),
            required,
        });
    }

    let width = buffer.width as usize;
    let pitch = buffer.pitch as usize;
    let src_len = width * SOURCE_PIXEL_BYTES;
    let mut row = vec![0u8; buffer.rgb_row_len()];

    let mut session = encoder.begin(writer, buffer.width, buffer.height)?;
    while session.next_scanline() < buffer.height {
        let offset = session.next_scanline() as usize * pitch;
        let src = &pixels[offset..offset + src_len];
        convert_row(Some(&mut row), RGB_PIXEL_BYTES, Some(src), SOURCE_PIXEL_BYTES, width);
        session.write_row(&row)?;
    }
    trace!(fb_id = buffer.fb_id, rows = buffer.height, "All rows written");

    session.finish()
}
