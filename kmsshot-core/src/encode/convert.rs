//! Row conversion from padded 32-bit pixels to packed RGB
//!
//! Scanout buffers hold one 32-bit word per pixel with an unused (or alpha)
//! byte. The JPEG encoder wants three bytes per pixel in R, G, B order.
//! Pixels are always walked from the last to the first, so a destination
//! that sits behind its source in the same memory never clobbers bytes that
//! are still to be read.

use crate::formats::{RGB_PIXEL_BYTES, SOURCE_PIXEL_BYTES};

/// Byte order of the 32-bit source pixel words
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Word 0xXXRRGGBB stored as [B, G, R, X]
    Little,
    /// Word 0xXXRRGGBB stored as [X, R, G, B]
    Big,
}

impl ByteOrder {
    /// Byte order of the machine we are running on
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Self::Big
        } else {
            Self::Little
        }
    }

    /// Offsets of the R, G and B bytes inside one source pixel
    const fn rgb_offsets(self) -> [usize; 3] {
        match self {
            Self::Little => [2, 1, 0],
            Self::Big => [1, 2, 3],
        }
    }
}

/// Bytes a buffer must hold for `count` pixels spaced `stride` apart
fn span(count: usize, stride: usize, pixel_bytes: usize) -> Option<usize> {
    (count - 1).checked_mul(stride)?.checked_add(pixel_bytes)
}

fn usable(dst_pixel_stride: usize, src_pixel_stride: usize, pixel_count: usize) -> bool {
    dst_pixel_stride >= RGB_PIXEL_BYTES && src_pixel_stride >= SOURCE_PIXEL_BYTES && pixel_count > 0
}

/// Convert `pixel_count` native-endian pixels from `src` into `dst`
///
/// See [`convert_row_with_order`].
pub fn convert_row(
    dst: Option<&mut [u8]>,
    dst_pixel_stride: usize,
    src: Option<&[u8]>,
    src_pixel_stride: usize,
    pixel_count: usize,
) {
    convert_row_with_order(
        dst,
        dst_pixel_stride,
        src,
        src_pixel_stride,
        pixel_count,
        ByteOrder::native(),
    );
}

/// Convert `pixel_count` pixels from `src` into `dst` using an explicit byte order
///
/// Does nothing if a stride is below the pixel size (3 for `dst`, 4 for
/// `src`), if either buffer is absent, or if either buffer is too short for
/// the requested pixel count.
pub fn convert_row_with_order(
    dst: Option<&mut [u8]>,
    dst_pixel_stride: usize,
    src: Option<&[u8]>,
    src_pixel_stride: usize,
    pixel_count: usize,
    order: ByteOrder,
) {
    let (Some(dst), Some(src)) = (dst, src) else {
        return;
    };
    if !usable(dst_pixel_stride, src_pixel_stride, pixel_count) {
        return;
    }
    let fits = |len: usize, stride: usize, bytes: usize| {
        span(pixel_count, stride, bytes).is_some_and(|need| need <= len)
    };
    if !fits(dst.len(), dst_pixel_stride, RGB_PIXEL_BYTES)
        || !fits(src.len(), src_pixel_stride, SOURCE_PIXEL_BYTES)
    {
        return;
    }

    let [r, g, b] = order.rgb_offsets();
    for i in (0..pixel_count).rev() {
        let si = i * src_pixel_stride;
        let di = i * dst_pixel_stride;
        dst[di] = src[si + r];
        dst[di + 1] = src[si + g];
        dst[di + 2] = src[si + b];
    }
}

/// Convert pixels where source and destination share one buffer
///
/// Same contract as [`convert_row_with_order`], with both regions given as
/// offsets into `buf`. Each source pixel is read completely before its
/// destination bytes are written.
pub fn convert_within(
    buf: &mut [u8],
    dst_offset: usize,
    dst_pixel_stride: usize,
    src_offset: usize,
    src_pixel_stride: usize,
    pixel_count: usize,
    order: ByteOrder,
) {
    if !usable(dst_pixel_stride, src_pixel_stride, pixel_count) {
        return;
    }
    let end = |offset: usize, stride: usize, bytes: usize| {
        span(pixel_count, stride, bytes).and_then(|need| need.checked_add(offset))
    };
    let in_bounds = |e: Option<usize>| e.is_some_and(|e| e <= buf.len());
    if !in_bounds(end(dst_offset, dst_pixel_stride, RGB_PIXEL_BYTES))
        || !in_bounds(end(src_offset, src_pixel_stride, SOURCE_PIXEL_BYTES))
    {
        return;
    }

    let [r, g, b] = order.rgb_offsets();
    for i in (0..pixel_count).rev() {
        let si = src_offset + i * src_pixel_stride;
        let di = dst_offset + i * dst_pixel_stride;
        let rgb = [buf[si + r], buf[si + g], buf[si + b]];
        buf[di..di + RGB_PIXEL_BYTES].copy_from_slice(&rgb);
    }
}
