//! Dumb-buffer export: one map-dumb ioctl on the framebuffer handle

use std::io;
use tracing::debug;

use super::{BufferExporter, BufferMapping, GemHandle};
use crate::device::KmsDevice;
use crate::error::{ExportStage, KmsshotError, Result};
use crate::types::ScanoutBuffer;

/// Maps the framebuffer's own handle via `DRM_IOCTL_MODE_MAP_DUMB`
///
/// The handle returned by the framebuffer query belongs to this process.
/// Its guard moves into the mapping and is closed after the unmap.
#[derive(Debug, Clone, Copy, Default)]
pub struct DumbBufferExport;

impl BufferExporter for DumbBufferExport {
    fn name(&self) -> &'static str {
        "dumb-buffer"
    }

    fn export_and_map<'d>(
        &self,
        device: &'d dyn KmsDevice,
        buffer: &ScanoutBuffer,
        fb_handle: Option<GemHandle<'d>>,
    ) -> Result<BufferMapping<'d>> {
        // GETFB hides handles from clients that are neither root nor master.
        let Some(handle) = fb_handle else {
            return Err(KmsshotError::Export {
                stage: ExportStage::MapOffset,
                handle: buffer.handle,
                source: io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "framebuffer handle not visible",
                ),
            });
        };

        let len = buffer.required_len()?;

        let offset = device
            .dumb_map_offset(handle.raw())
            .map_err(|source| KmsshotError::Export {
                stage: ExportStage::MapOffset,
                handle: handle.raw(),
                source,
            })?;

        let ptr = device
            .map_read_only(offset, len)
            .map_err(|source| KmsshotError::Export {
                stage: ExportStage::Mmap,
                handle: handle.raw(),
                source,
            })?;

        debug!(
            fb_id = buffer.fb_id,
            handle = handle.raw(),
            offset,
            len,
            "Mapped dumb buffer"
        );

        // SAFETY: `ptr` was just mapped by `device` with length `len`.
        Ok(unsafe { BufferMapping::from_raw(device, ptr, len, Some(handle), None) })
    }
}
