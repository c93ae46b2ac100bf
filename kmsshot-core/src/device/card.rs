//! DRM card node backed by raw ioctls

use bytemuck::Zeroable;
use std::fs::{self, OpenOptions};
use std::io;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};
use tracing::{debug, info};

use super::ioctl::*;
use super::{GemObject, KmsDevice};
use crate::error::{KmsshotError, Result};
use crate::types::ScanoutBuffer;

/// An open DRM card node, e.g. `/dev/dri/card0`
#[derive(Debug)]
pub struct Card {
    fd: OwnedFd,
    path: PathBuf,
}

impl Card {
    /// Open a DRM device read-write
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_CLOEXEC)
            .open(&path)
            .map_err(|source| KmsshotError::DeviceOpen {
                path: path.clone(),
                source,
            })?;

        info!("Opened DRM device {:?}", path);
        Ok(Self {
            fd: file.into(),
            path,
        })
    }

    /// Path the device was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn raw(&self) -> RawFd {
        self.fd.as_raw_fd()
    }

    fn get_crtc(&self, crtc_id: u32) -> io::Result<DrmModeCrtc> {
        let mut crtc = DrmModeCrtc::zeroed();
        crtc.crtc_id = crtc_id;
        drm_ioctl(self.raw(), DRM_IOCTL_MODE_GETCRTC, &mut crtc)?;
        Ok(crtc)
    }

    fn get_fb(&self, fb_id: u32) -> io::Result<DrmModeFbCmd> {
        let mut fb = DrmModeFbCmd::zeroed();
        fb.fb_id = fb_id;
        drm_ioctl(self.raw(), DRM_IOCTL_MODE_GETFB, &mut fb)?;
        Ok(fb)
    }
}

impl KmsDevice for Card {
    fn driver_name(&self) -> io::Result<String> {
        let mut version = DrmVersion::zeroed();
        drm_ioctl(self.raw(), DRM_IOCTL_VERSION, &mut version)?;

        let mut name = vec![0u8; version.name_len];
        version.name = name.as_mut_ptr().cast();
        version.date_len = 0;
        version.desc_len = 0;
        drm_ioctl(self.raw(), DRM_IOCTL_VERSION, &mut version)?;

        name.truncate(version.name_len);
        Ok(String::from_utf8_lossy(&name).into_owned())
    }

    fn supports_dumb_buffers(&self) -> bool {
        let mut cap = DrmGetCap {
            capability: DRM_CAP_DUMB_BUFFER,
            value: 0,
        };
        drm_ioctl(self.raw(), DRM_IOCTL_GET_CAP, &mut cap).is_ok() && cap.value != 0
    }

    fn crtc_ids(&self) -> Result<Vec<u32>> {
        let mut res = DrmModeCardRes::zeroed();

        // First call to get counts
        drm_ioctl(self.raw(), DRM_IOCTL_MODE_GETRESOURCES, &mut res)
            .map_err(KmsshotError::Resources)?;

        let mut fb_ids = vec![0u32; res.count_fbs as usize];
        let mut crtc_ids = vec![0u32; res.count_crtcs as usize];
        let mut connector_ids = vec![0u32; res.count_connectors as usize];
        let mut encoder_ids = vec![0u32; res.count_encoders as usize];

        res.fb_id_ptr = fb_ids.as_mut_ptr() as u64;
        res.crtc_id_ptr = crtc_ids.as_mut_ptr() as u64;
        res.connector_id_ptr = connector_ids.as_mut_ptr() as u64;
        res.encoder_id_ptr = encoder_ids.as_mut_ptr() as u64;

        // Second call to get actual data
        drm_ioctl(self.raw(), DRM_IOCTL_MODE_GETRESOURCES, &mut res)
            .map_err(KmsshotError::Resources)?;

        crtc_ids.truncate(res.count_crtcs as usize);
        debug!(
            crtcs = crtc_ids.len(),
            connectors = connector_ids.len(),
            encoders = encoder_ids.len(),
            "Read mode resources"
        );
        Ok(crtc_ids)
    }

    fn scanout_buffer(&self, crtc_id: u32) -> Result<Option<ScanoutBuffer>> {
        let crtc = self
            .get_crtc(crtc_id)
            .map_err(|source| KmsshotError::Resolve { crtc_id, source })?;

        if crtc.fb_id == 0 {
            return Ok(None);
        }

        let fb = self
            .get_fb(crtc.fb_id)
            .map_err(|source| KmsshotError::Resolve { crtc_id, source })?;

        Ok(Some(ScanoutBuffer {
            fb_id: fb.fb_id,
            handle: fb.handle,
            width: fb.width,
            height: fb.height,
            pitch: fb.pitch,
            bpp: fb.bpp,
            depth: fb.depth,
        }))
    }

    fn gem_flink(&self, handle: u32) -> io::Result<u32> {
        let mut flink = DrmGemFlink { handle, name: 0 };
        drm_ioctl(self.raw(), DRM_IOCTL_GEM_FLINK, &mut flink)?;
        Ok(flink.name)
    }

    fn gem_open(&self, name: u32) -> io::Result<GemObject> {
        let mut open = DrmGemOpen {
            name,
            handle: 0,
            size: 0,
        };
        drm_ioctl(self.raw(), DRM_IOCTL_GEM_OPEN, &mut open)?;
        Ok(GemObject {
            handle: open.handle,
            size: open.size,
        })
    }

    fn gem_close(&self, handle: u32) -> io::Result<()> {
        let mut close = DrmGemClose { handle, pad: 0 };
        drm_ioctl(self.raw(), DRM_IOCTL_GEM_CLOSE, &mut close)
    }

    fn gtt_map_offset(&self, handle: u32) -> io::Result<u64> {
        let mut arg = DrmI915GemMmapGtt {
            handle,
            pad: 0,
            offset: 0,
        };
        drm_ioctl(self.raw(), DRM_IOCTL_I915_GEM_MMAP_GTT, &mut arg)?;
        Ok(arg.offset)
    }

    fn dumb_map_offset(&self, handle: u32) -> io::Result<u64> {
        let mut arg = DrmModeMapDumb {
            handle,
            pad: 0,
            offset: 0,
        };
        drm_ioctl(self.raw(), DRM_IOCTL_MODE_MAP_DUMB, &mut arg)?;
        Ok(arg.offset)
    }

    fn map_read_only(&self, offset: u64, len: usize) -> io::Result<NonNull<u8>> {
        let offset = libc::off_t::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "mmap offset out of range"))?;

        // SAFETY: a fresh read-only shared mapping of the device fd; the kernel
        // validates offset and length against the buffer object.
        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ,
                libc::MAP_SHARED,
                self.raw(),
                offset,
            )
        };

        if ptr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        NonNull::new(ptr.cast()).ok_or_else(|| io::Error::other("mmap returned null"))
    }

    unsafe fn unmap(&self, ptr: NonNull<u8>, len: usize) -> io::Result<()> {
        // SAFETY: the caller guarantees ptr/len came from `map_read_only`.
        if unsafe { libc::munmap(ptr.as_ptr().cast(), len) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

/// List DRM card nodes under `/dev/dri`
pub fn list_devices() -> Vec<PathBuf> {
    let mut devices: Vec<PathBuf> = fs::read_dir("/dev/dri")
        .into_iter()
        .flatten()
        .flatten()
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("card"))
        .map(|entry| entry.path())
        .collect();
    devices.sort();
    devices
}
