//! DRM device access
//!
//! [`KmsDevice`] is the only boundary where kernel calls happen. [`Card`]
//! implements it for a real `/dev/dri/cardN` node; tests substitute a fake.

mod card;
mod ioctl;

pub use card::{list_devices, Card};

use std::io;
use std::ptr::NonNull;
use tracing::{debug, warn};

use crate::error::Result;
use crate::types::ScanoutBuffer;

/// A GEM object opened from a global name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GemObject {
    /// Handle local to our file descriptor
    pub handle: u32,
    /// Size of the object in bytes
    pub size: u64,
}

/// Kernel mode-setting and buffer calls needed for capture
pub trait KmsDevice {
    /// Name of the kernel driver, e.g. "i915" or "amdgpu"
    fn driver_name(&self) -> io::Result<String>;

    /// Whether the driver supports dumb buffers (`DRM_CAP_DUMB_BUFFER`)
    fn supports_dumb_buffers(&self) -> bool;

    /// All CRTC IDs on the device
    ///
    /// Failure means the device has no usable mode resources and is fatal.
    fn crtc_ids(&self) -> Result<Vec<u32>>;

    /// The framebuffer currently attached to a CRTC, if any
    fn scanout_buffer(&self, crtc_id: u32) -> Result<Option<ScanoutBuffer>>;

    /// Export a handle as a global GEM name
    fn gem_flink(&self, handle: u32) -> io::Result<u32>;

    /// Open a global GEM name, yielding a new local handle
    fn gem_open(&self, name: u32) -> io::Result<GemObject>;

    /// Release a local GEM handle
    fn gem_close(&self, handle: u32) -> io::Result<()>;

    /// Fake mmap offset for a GTT mapping of the object (i915)
    fn gtt_map_offset(&self, handle: u32) -> io::Result<u64>;

    /// Fake mmap offset for a dumb buffer
    fn dumb_map_offset(&self, handle: u32) -> io::Result<u64>;

    /// Map `len` bytes at `offset` read-only and shared
    fn map_read_only(&self, offset: u64, len: usize) -> io::Result<NonNull<u8>>;

    /// Unmap a region returned by [`KmsDevice::map_read_only`]
    ///
    /// # Safety
    ///
    /// `ptr` and `len` must be exactly what a previous `map_read_only` on this
    /// device returned and was asked for, and the region must not be used
    /// afterwards.
    unsafe fn unmap(&self, ptr: NonNull<u8>, len: usize) -> io::Result<()>;
}

/// A GEM handle local to our file descriptor, closed when dropped
///
/// Both the handle GETFB hands out for a scanout buffer and the handle
/// `gem_open` returns take a reference on the object; each is wrapped in
/// one of these as soon as it exists.
pub struct GemHandle<'d> {
    device: &'d dyn KmsDevice,
    handle: u32,
}

impl<'d> GemHandle<'d> {
    /// Take ownership of `handle`
    pub fn new(device: &'d dyn KmsDevice, handle: u32) -> Self {
        Self { device, handle }
    }

    /// The raw handle value
    pub fn raw(&self) -> u32 {
        self.handle
    }
}

impl Drop for GemHandle<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.device.gem_close(self.handle) {
            warn!(handle = self.handle, "Failed to close GEM handle: {}", e);
        } else {
            debug!(handle = self.handle, "Closed GEM handle");
        }
    }
}

impl std::fmt::Debug for GemHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("GemHandle").field(&self.handle).finish()
    }
}
