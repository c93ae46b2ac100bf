//! GEM-name export: flink, reopen by name, GTT mmap

use std::io;
use tracing::debug;

use super::{BufferExporter, BufferMapping, GemHandle};
use crate::device::KmsDevice;
use crate::error::{ExportStage, KmsshotError, Result};
use crate::types::ScanoutBuffer;

/// Shares the framebuffer handle through a global GEM name and maps the
/// reopened object through the i915 GTT
///
/// The mapping covers the whole GEM object, which is at least
/// `pitch * height` bytes for a scanout buffer. The reopened handle is
/// closed first on release, the framebuffer handle after it.
#[derive(Debug, Clone, Copy, Default)]
pub struct GemNameExport;

impl BufferExporter for GemNameExport {
    fn name(&self) -> &'static str {
        "gem-name"
    }

    fn export_and_map<'d>(
        &self,
        device: &'d dyn KmsDevice,
        buffer: &ScanoutBuffer,
        fb_handle: Option<GemHandle<'d>>,
    ) -> Result<BufferMapping<'d>> {
        let export_err = |stage, handle, source| KmsshotError::Export {
            stage,
            handle,
            source,
        };

        let Some(source) = fb_handle else {
            return Err(export_err(
                ExportStage::Flink,
                buffer.handle,
                io::Error::new(io::ErrorKind::PermissionDenied, "framebuffer handle not visible"),
            ));
        };

        // `handle` is declared after `source`, so an early return closes it first.
        let name = device
            .gem_flink(source.raw())
            .map_err(|e| export_err(ExportStage::Flink, source.raw(), e))?;

        let object = device
            .gem_open(name)
            .map_err(|e| export_err(ExportStage::Open, source.raw(), e))?;
        let handle = GemHandle::new(device, object.handle);

        let len = usize::try_from(object.size).map_err(|_| {
            KmsshotError::invalid_buffer(format!(
                "GEM object of {} bytes does not fit in memory",
                object.size
            ))
        })?;

        let offset = device
            .gtt_map_offset(handle.raw())
            .map_err(|e| export_err(ExportStage::MapOffset, handle.raw(), e))?;

        let ptr = device
            .map_read_only(offset, len)
            .map_err(|e| export_err(ExportStage::Mmap, handle.raw(), e))?;

        debug!(
            fb_id = buffer.fb_id,
            name,
            handle = handle.raw(),
            offset,
            len,
            "Mapped GEM object"
        );

        // SAFETY: `ptr` was just mapped by `device` with length `len`.
        Ok(unsafe { BufferMapping::from_raw(device, ptr, len, Some(handle), Some(source)) })
    }
}
