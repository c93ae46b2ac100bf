//! Mock infrastructure for testing
//!
//! Provides an in-memory [`KmsDevice`] whose buffer objects are plain byte
//! vectors, plus helpers for building test framebuffers.

#![allow(dead_code)]

use kmsshot_core::device::{GemObject, KmsDevice};
use kmsshot_core::error::{KmsshotError, Result};
use kmsshot_core::types::ScanoutBuffer;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::io;
use std::ptr::NonNull;

/// Spacing of fake mmap offsets; the handle is `offset / MAP_STRIDE`
pub const MAP_STRIDE: u64 = 0x1000;

/// First handle returned by `gem_open`
pub const FIRST_OPENED_HANDLE: u32 = 1000;

/// Kernel call recorded by [`FakeDevice`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Flink(u32),
    Open(u32),
    GttOffset(u32),
    DumbOffset(u32),
    Map { offset: u64, len: usize },
    Unmap { len: usize },
    Close(u32),
}

/// Call that can be made to fail, keyed by the framebuffer's handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Flink,
    Open,
    GttOffset,
    DumbOffset,
    Map,
}

enum Crtc {
    Active(ScanoutBuffer),
    Idle,
    Broken,
}

/// In-memory DRM device
pub struct FakeDevice {
    dumb: bool,
    resources_fail: bool,
    crtcs: Vec<(u32, Crtc)>,
    // Pixel storage per framebuffer handle. Never mutated after setup so
    // pointers handed out by `map_read_only` stay valid.
    objects: HashMap<u32, Vec<u8>>,
    gem_sizes: HashMap<u32, u64>,
    failures: HashSet<(FailPoint, u32)>,
    opened: RefCell<HashMap<u32, u32>>,
    next_handle: Cell<u32>,
    events: RefCell<Vec<Event>>,
}

impl FakeDevice {
    /// A device that supports dumb buffers and has no CRTCs
    pub fn new() -> Self {
        Self {
            dumb: true,
            resources_fail: false,
            crtcs: Vec::new(),
            objects: HashMap::new(),
            gem_sizes: HashMap::new(),
            failures: HashSet::new(),
            opened: RefCell::new(HashMap::new()),
            next_handle: Cell::new(FIRST_OPENED_HANDLE),
            events: RefCell::new(Vec::new()),
        }
    }

    /// Set whether `DRM_CAP_DUMB_BUFFER` is reported
    pub fn with_dumb_buffers(mut self, dumb: bool) -> Self {
        self.dumb = dumb;
        self
    }

    /// Make resource enumeration fail with EACCES
    pub fn with_resources_failure(mut self) -> Self {
        self.resources_fail = true;
        self
    }

    /// Add a CRTC scanning out `buffer` backed by `pixels`
    pub fn with_output(mut self, crtc_id: u32, buffer: ScanoutBuffer, pixels: Vec<u8>) -> Self {
        self.objects.insert(buffer.handle, pixels);
        self.crtcs.push((crtc_id, Crtc::Active(buffer)));
        self
    }

    /// Add a CRTC with no framebuffer attached
    pub fn with_idle_crtc(mut self, crtc_id: u32) -> Self {
        self.crtcs.push((crtc_id, Crtc::Idle));
        self
    }

    /// Add a CRTC whose lookup fails
    pub fn with_broken_crtc(mut self, crtc_id: u32) -> Self {
        self.crtcs.push((crtc_id, Crtc::Broken));
        self
    }

    /// Report `size` for the object when it is opened by name
    pub fn with_gem_size(mut self, handle: u32, size: u64) -> Self {
        self.gem_sizes.insert(handle, size);
        self
    }

    /// Fail `point` for the framebuffer with `handle`
    pub fn failing(mut self, point: FailPoint, handle: u32) -> Self {
        self.failures.insert((point, handle));
        self
    }

    /// All recorded calls in order
    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    /// Number of `gem_close` calls for `handle`
    pub fn close_count(&self, handle: u32) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| **e == Event::Close(handle))
            .count()
    }

    /// Number of maps minus number of unmaps
    pub fn live_mappings(&self) -> isize {
        self.events.borrow().iter().fold(0, |n, e| match e {
            Event::Map { .. } => n + 1,
            Event::Unmap { .. } => n - 1,
            _ => n,
        })
    }

    fn record(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }

    fn source_handle(&self, handle: u32) -> u32 {
        self.opened.borrow().get(&handle).copied().unwrap_or(handle)
    }

    fn check(&self, point: FailPoint, handle: u32) -> io::Result<()> {
        if self.failures.contains(&(point, self.source_handle(handle))) {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }
        Ok(())
    }
}

impl Default for FakeDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl KmsDevice for FakeDevice {
    fn driver_name(&self) -> io::Result<String> {
        Ok("fake".to_string())
    }

    fn supports_dumb_buffers(&self) -> bool {
        self.dumb
    }

    fn crtc_ids(&self) -> Result<Vec<u32>> {
        if self.resources_fail {
            return Err(KmsshotError::Resources(io::Error::from_raw_os_error(libc::EACCES)));
        }
        Ok(self.crtcs.iter().map(|(id, _)| *id).collect())
    }

    fn scanout_buffer(&self, crtc_id: u32) -> Result<Option<ScanoutBuffer>> {
        match self.crtcs.iter().find(|(id, _)| *id == crtc_id) {
            Some((_, Crtc::Active(buffer))) => Ok(Some(*buffer)),
            Some((_, Crtc::Idle)) => Ok(None),
            Some((_, Crtc::Broken)) | None => Err(KmsshotError::Resolve {
                crtc_id,
                source: io::Error::from_raw_os_error(libc::ENOENT),
            }),
        }
    }

    fn gem_flink(&self, handle: u32) -> io::Result<u32> {
        self.record(Event::Flink(handle));
        self.check(FailPoint::Flink, handle)?;
        Ok(handle + 100)
    }

    fn gem_open(&self, name: u32) -> io::Result<GemObject> {
        self.record(Event::Open(name));
        let source = name - 100;
        self.check(FailPoint::Open, source)?;

        let handle = self.next_handle.get();
        self.next_handle.set(handle + 1);
        self.opened.borrow_mut().insert(handle, source);

        let size = match self.gem_sizes.get(&source) {
            Some(size) => *size,
            None => self.objects.get(&source).map_or(0, |p| p.len() as u64),
        };
        Ok(GemObject { handle, size })
    }

    fn gem_close(&self, handle: u32) -> io::Result<()> {
        self.record(Event::Close(handle));
        Ok(())
    }

    fn gtt_map_offset(&self, handle: u32) -> io::Result<u64> {
        self.record(Event::GttOffset(handle));
        self.check(FailPoint::GttOffset, handle)?;
        Ok(u64::from(handle) * MAP_STRIDE)
    }

    fn dumb_map_offset(&self, handle: u32) -> io::Result<u64> {
        self.record(Event::DumbOffset(handle));
        self.check(FailPoint::DumbOffset, handle)?;
        Ok(u64::from(handle) * MAP_STRIDE)
    }

    fn map_read_only(&self, offset: u64, len: usize) -> io::Result<NonNull<u8>> {
        let handle = (offset / MAP_STRIDE) as u32;
        self.check(FailPoint::Map, handle)?;

        let pixels = self
            .objects
            .get(&self.source_handle(handle))
            .ok_or_else(|| io::Error::from_raw_os_error(libc::EINVAL))?;
        if len > pixels.len() {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }
        let ptr = NonNull::new(pixels.as_ptr().cast_mut())
            .ok_or_else(|| io::Error::other("empty object"))?;
        self.record(Event::Map { offset, len });
        Ok(ptr)
    }

    unsafe fn unmap(&self, _ptr: NonNull<u8>, len: usize) -> io::Result<()> {
        self.record(Event::Unmap { len });
        Ok(())
    }
}

/// A 32 bpp, depth 24 framebuffer descriptor
pub fn scanout(fb_id: u32, handle: u32, width: u32, height: u32, pitch: u32) -> ScanoutBuffer {
    ScanoutBuffer {
        fb_id,
        handle,
        width,
        height,
        pitch,
        bpp: 32,
        depth: 24,
    }
}

/// Pixel (x, y) stored as B = x, G = y, R = x + y, X = 0; padding bytes are 0xEE
pub fn gradient_pixels(width: u32, height: u32, pitch: u32) -> Vec<u8> {
    let mut data = vec![0xEE; (pitch * height) as usize];
    for y in 0..height {
        for x in 0..width {
            let i = (y * pitch + x * 4) as usize;
            data[i..i + 4].copy_from_slice(&[x as u8, y as u8, (x + y) as u8, 0]);
        }
    }
    data
}

/// Every pixel set to `bgrx`; padding bytes are 0xEE
pub fn solid_pixels(width: u32, height: u32, pitch: u32, bgrx: [u8; 4]) -> Vec<u8> {
    let mut data = vec![0xEE; (pitch * height) as usize];
    for y in 0..height {
        for x in 0..width {
            let i = (y * pitch + x * 4) as usize;
            data[i..i + 4].copy_from_slice(&bgrx);
        }
    }
    data
}

/// Top half `top`, bottom half `bottom`, both BGRX
pub fn split_pixels(width: u32, height: u32, pitch: u32, top: [u8; 4], bottom: [u8; 4]) -> Vec<u8> {
    let mut data = solid_pixels(width, height, pitch, bottom);
    for y in 0..height / 2 {
        for x in 0..width {
            let i = (y * pitch + x * 4) as usize;
            data[i..i + 4].copy_from_slice(&top);
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gradient_pixels_layout() {
        let data = gradient_pixels(4, 2, 20);
        assert_eq!(data.len(), 40);
        assert_eq!(&data[20 + 3 * 4..20 + 4 * 4], &[3, 1, 4, 0]);
        assert_eq!(data[16], 0xEE);
    }

    #[test]
    fn test_fake_device_lists_crtcs() {
        let device = FakeDevice::new()
            .with_idle_crtc(31)
            .with_output(32, scanout(60, 7, 2, 2, 8), solid_pixels(2, 2, 8, [1, 2, 3, 0]));
        assert_eq!(device.crtc_ids().unwrap(), vec![31, 32]);
        assert!(device.scanout_buffer(31).unwrap().is_none());
        assert_eq!(device.scanout_buffer(32).unwrap().unwrap().fb_id, 60);
    }
}
