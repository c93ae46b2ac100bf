//! Read-only CPU mappings of scanout buffers
//!
//! Two strategies are available and one is picked per run:
//! - [`DumbBufferExport`]: map the framebuffer handle directly with
//!   `MODE_MAP_DUMB`. Works on any driver advertising dumb buffers.
//! - [`GemNameExport`]: flink the handle to a global name, reopen it and map
//!   it through the i915 GTT. For hardware that needs the sharing step.
//!
//! Every handle is held by a [`GemHandle`] guard, starting with the
//! framebuffer handle taken over from output resolution. A successful export
//! moves the guards into the [`BufferMapping`], whose drop unmaps first, then
//! closes the mapped object's handle, then the framebuffer handle.

mod dumb;
mod gem;

pub use dumb::DumbBufferExport;
pub use gem::GemNameExport;

pub use crate::device::GemHandle;

use serde::{Deserialize, Serialize};
use std::ptr::NonNull;
use tracing::{debug, info, warn};

use crate::device::KmsDevice;
use crate::error::Result;
use crate::types::ScanoutBuffer;

/// Which export strategy to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ExportStrategy {
    /// Dumb buffers when the driver supports them, GEM names otherwise
    #[default]
    Auto,
    /// Map-dumb ioctl on the framebuffer handle
    Dumb,
    /// flink / open / GTT mmap
    GemName,
}

impl std::fmt::Display for ExportStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Dumb => write!(f, "dumb"),
            Self::GemName => write!(f, "gem-name"),
        }
    }
}

impl std::str::FromStr for ExportStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "dumb" => Ok(Self::Dumb),
            "gem-name" | "gem" | "flink" => Ok(Self::GemName),
            _ => Err(format!("Unknown export strategy: {}", s)),
        }
    }
}

impl ExportStrategy {
    /// Resolve `Auto` against the device's capabilities
    pub fn resolve(self, device: &dyn KmsDevice) -> Self {
        match self {
            Self::Auto if device.supports_dumb_buffers() => Self::Dumb,
            Self::Auto => Self::GemName,
            other => other,
        }
    }
}

/// Create the exporter for a strategy, probing the device for `Auto`
pub fn select_exporter(
    strategy: ExportStrategy,
    device: &dyn KmsDevice,
) -> Box<dyn BufferExporter> {
    let resolved = strategy.resolve(device);
    let exporter: Box<dyn BufferExporter> = match resolved {
        ExportStrategy::GemName => Box::new(GemNameExport),
        ExportStrategy::Dumb | ExportStrategy::Auto => Box::new(DumbBufferExport),
    };
    info!("Using {} buffer export (requested: {})", exporter.name(), strategy);
    exporter
}

/// Obtains a read-only CPU mapping of a scanout buffer
pub trait BufferExporter {
    /// Short strategy name for diagnostics
    fn name(&self) -> &'static str;

    /// Export the buffer's handle and map its memory read-only, shared
    ///
    /// `fb_handle` owns `buffer.handle` (`None` when GETFB hid it). It and
    /// any handle acquired before a failure are released before returning.
    fn export_and_map<'d>(
        &self,
        device: &'d dyn KmsDevice,
        buffer: &ScanoutBuffer,
        fb_handle: Option<GemHandle<'d>>,
    ) -> Result<BufferMapping<'d>>;
}

/// A read-only view of a buffer's memory
///
/// Dropping it unmaps the exact length that was mapped, then closes the
/// mapped handle, then the framebuffer handle it was exported from.
pub struct BufferMapping<'d> {
    device: &'d dyn KmsDevice,
    ptr: NonNull<u8>,
    len: usize,
    // Fields drop in declaration order, after `Drop::drop` has unmapped.
    handle: Option<GemHandle<'d>>,
    source: Option<GemHandle<'d>>,
}

impl<'d> BufferMapping<'d> {
    /// Wrap a region returned by `device.map_read_only(_, len)`
    ///
    /// # Safety
    ///
    /// `ptr` must be a live mapping of at least `len` readable bytes created
    /// by `device`, not owned by anything else.
    pub(crate) unsafe fn from_raw(
        device: &'d dyn KmsDevice,
        ptr: NonNull<u8>,
        len: usize,
        handle: Option<GemHandle<'d>>,
        source: Option<GemHandle<'d>>,
    ) -> Self {
        Self {
            device,
            ptr,
            len,
            handle,
            source,
        }
    }

    /// Mapped length in bytes
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the mapping is zero bytes long
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The GEM handle released together with this mapping
    pub fn handle(&self) -> Option<u32> {
        self.handle.as_ref().map(GemHandle::raw)
    }

    /// The framebuffer handle released after [`BufferMapping::handle`],
    /// when the mapping was made through a second handle
    pub fn source_handle(&self) -> Option<u32> {
        self.source.as_ref().map(GemHandle::raw)
    }

    /// The mapped bytes
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: `from_raw` guarantees `len` readable bytes that stay mapped
        // until `self` is dropped.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for BufferMapping<'_> {
    fn drop(&mut self) {
        // SAFETY: ptr/len are exactly what `map_read_only` returned and
        // nothing borrows the slice past this point.
        match unsafe { self.device.unmap(self.ptr, self.len) } {
            Ok(()) => debug!(len = self.len, "Unmapped buffer"),
            Err(e) => warn!(len = self.len, "Failed to unmap buffer: {}", e),
        }
    }
}

impl std::fmt::Debug for BufferMapping<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferMapping")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .field("handle", &self.handle())
            .field("source", &self.source_handle())
            .finish()
    }
}
