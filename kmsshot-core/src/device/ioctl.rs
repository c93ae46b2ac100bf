//! DRM ioctl numbers and argument structures
//!
//! Layouts follow `include/uapi/drm/drm.h`, `drm_mode.h` and `i915_drm.h`.
//! Structs keep every uapi field; those with fields we never read carry
//! `#[allow(dead_code)]`.

use bytemuck::Zeroable;
use libc::{c_char, c_int, c_ulong};
use std::io;
use std::mem::size_of;
use std::os::fd::RawFd;

const DRM_IOCTL_BASE: c_ulong = b'd' as c_ulong;
const DRM_COMMAND_BASE: c_ulong = 0x40;

const IOC_WRITE: c_ulong = 1;
const IOC_READ: c_ulong = 2;

const fn ioc(dir: c_ulong, nr: c_ulong, size: usize) -> c_ulong {
    (dir << 30) | ((size as c_ulong) << 16) | (DRM_IOCTL_BASE << 8) | nr
}

const fn iowr<T>(nr: c_ulong) -> c_ulong {
    ioc(IOC_READ | IOC_WRITE, nr, size_of::<T>())
}

const fn iow<T>(nr: c_ulong) -> c_ulong {
    ioc(IOC_WRITE, nr, size_of::<T>())
}

pub const DRM_IOCTL_VERSION: c_ulong = iowr::<DrmVersion>(0x00);
pub const DRM_IOCTL_GEM_CLOSE: c_ulong = iow::<DrmGemClose>(0x09);
pub const DRM_IOCTL_GEM_FLINK: c_ulong = iowr::<DrmGemFlink>(0x0a);
pub const DRM_IOCTL_GEM_OPEN: c_ulong = iowr::<DrmGemOpen>(0x0b);
pub const DRM_IOCTL_GET_CAP: c_ulong = iowr::<DrmGetCap>(0x0c);
pub const DRM_IOCTL_MODE_GETRESOURCES: c_ulong = iowr::<DrmModeCardRes>(0xA0);
pub const DRM_IOCTL_MODE_GETCRTC: c_ulong = iowr::<DrmModeCrtc>(0xA1);
pub const DRM_IOCTL_MODE_GETFB: c_ulong = iowr::<DrmModeFbCmd>(0xAD);
pub const DRM_IOCTL_MODE_MAP_DUMB: c_ulong = iowr::<DrmModeMapDumb>(0xB3);
pub const DRM_IOCTL_I915_GEM_MMAP_GTT: c_ulong = iowr::<DrmI915GemMmapGtt>(DRM_COMMAND_BASE + 0x24);

pub const DRM_CAP_DUMB_BUFFER: u64 = 0x1;

#[allow(dead_code)]
#[repr(C)]
#[derive(Zeroable)]
pub struct DrmVersion {
    pub version_major: c_int,
    pub version_minor: c_int,
    pub version_patchlevel: c_int,
    pub name_len: usize,
    pub name: *mut c_char,
    pub date_len: usize,
    pub date: *mut c_char,
    pub desc_len: usize,
    pub desc: *mut c_char,
}

#[allow(dead_code)]
#[repr(C)]
#[derive(Zeroable)]
pub struct DrmGemClose {
    pub handle: u32,
    pub pad: u32,
}

#[allow(dead_code)]
#[repr(C)]
#[derive(Zeroable)]
pub struct DrmGemFlink {
    pub handle: u32,
    pub name: u32,
}

#[allow(dead_code)]
#[repr(C)]
#[derive(Zeroable)]
pub struct DrmGemOpen {
    pub name: u32,
    pub handle: u32,
    pub size: u64,
}

#[allow(dead_code)]
#[repr(C)]
#[derive(Zeroable)]
pub struct DrmGetCap {
    pub capability: u64,
    pub value: u64,
}

#[allow(dead_code)]
#[repr(C)]
#[derive(Zeroable)]
pub struct DrmModeCardRes {
    pub fb_id_ptr: u64,
    pub crtc_id_ptr: u64,
    pub connector_id_ptr: u64,
    pub encoder_id_ptr: u64,
    pub count_fbs: u32,
    pub count_crtcs: u32,
    pub count_connectors: u32,
    pub count_encoders: u32,
    pub min_width: u32,
    pub max_width: u32,
    pub min_height: u32,
    pub max_height: u32,
}

#[allow(dead_code)]
#[repr(C)]
#[derive(Zeroable)]
pub struct DrmModeModeInfo {
    pub clock: u32,
    pub hdisplay: u16,
    pub hsync_start: u16,
    pub hsync_end: u16,
    pub htotal: u16,
    pub hskew: u16,
    pub vdisplay: u16,
    pub vsync_start: u16,
    pub vsync_end: u16,
    pub vtotal: u16,
    pub vscan: u16,
    pub vrefresh: u32,
    pub flags: u32,
    pub type_: u32,
    pub name: [u8; 32],
}

#[allow(dead_code)]
#[repr(C)]
#[derive(Zeroable)]
pub struct DrmModeCrtc {
    pub set_connectors_ptr: u64,
    pub count_connectors: u32,
    pub crtc_id: u32,
    pub fb_id: u32,
    pub x: u32,
    pub y: u32,
    pub gamma_size: u32,
    pub mode_valid: u32,
    pub mode: DrmModeModeInfo,
}

#[repr(C)]
#[derive(Zeroable)]
pub struct DrmModeFbCmd {
    pub fb_id: u32,
    pub width: u32,
    pub height: u32,
    pub pitch: u32,
    pub bpp: u32,
    pub depth: u32,
    pub handle: u32,
}

#[allow(dead_code)]
#[repr(C)]
#[derive(Zeroable)]
pub struct DrmModeMapDumb {
    pub handle: u32,
    pub pad: u32,
    pub offset: u64,
}

#[allow(dead_code)]
#[repr(C)]
#[derive(Zeroable)]
pub struct DrmI915GemMmapGtt {
    pub handle: u32,
    pub pad: u32,
    pub offset: u64,
}

/// Issue an ioctl, restarting on EINTR and EAGAIN
pub fn drm_ioctl<T>(fd: RawFd, request: c_ulong, arg: &mut T) -> io::Result<()> {
    loop {
        // SAFETY: `arg` is a live, exclusively borrowed #[repr(C)] struct whose
        // layout matches the kernel's argument type for `request`.
        let ret = unsafe { libc::ioctl(fd, request as _, arg as *mut T) };
        if ret == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::EINTR) | Some(libc::EAGAIN) => continue,
            _ => return Err(err),
        }
    }
}
