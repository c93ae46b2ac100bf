//! Pixel format helpers for legacy framebuffer descriptors
//!
//! `MODE_GETFB` only reports a colour depth and a bits-per-pixel value, not a
//! fourcc. These helpers map those pairs to names and sizes. Only 32 bpp
//! packed formats can be captured.

/// The only bits-per-pixel value the capture pipeline accepts
pub const SUPPORTED_BPP: u32 = 32;

/// Source bytes per pixel for supported framebuffers
pub const SOURCE_PIXEL_BYTES: usize = 4;

/// Destination bytes per pixel (packed RGB)
pub const RGB_PIXEL_BYTES: usize = 3;

/// Get the bytes per pixel for a bits-per-pixel value, rounded up
pub fn bytes_per_pixel(bpp: u32) -> u32 {
    bpp.div_ceil(8)
}

/// Check if a framebuffer with this depth/bpp can be captured
///
/// 10-bit formats also use 32 bpp but do not have byte-aligned channels.
pub fn is_supported(depth: u32, bpp: u32) -> bool {
    bpp == SUPPORTED_BPP && matches!(depth, 24 | 32)
}

/// Format name for a depth/bpp pair, for display
pub fn format_name(depth: u32, bpp: u32) -> &'static str {
    match (depth, bpp) {
        (24, 32) => "XRGB8888",
        (32, 32) => "ARGB8888",
        (30, 32) => "XRGB2101010",
        (24, 24) => "RGB888",
        (16, 16) => "RGB565",
        (15, 16) => "XRGB1555",
        (8, 8) => "C8",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_per_pixel() {
        assert_eq!(bytes_per_pixel(32), 4);
        assert_eq!(bytes_per_pixel(24), 3);
        assert_eq!(bytes_per_pixel(16), 2);
        assert_eq!(bytes_per_pixel(15), 2);
    }

    #[test]
    fn test_is_supported() {
        assert!(is_supported(24, 32));
        assert!(is_supported(32, 32));
        assert!(!is_supported(30, 32));
        assert!(!is_supported(24, 24));
        assert!(!is_supported(16, 16));
    }

    #[test]
    fn test_format_name() {
        assert_eq!(format_name(24, 32), "XRGB8888");
        assert_eq!(format_name(16, 16), "RGB565");
        assert_eq!(format_name(12, 12), "Unknown");
    }
}
