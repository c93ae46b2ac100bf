//! kmsshot Core Library
//!
//! Screenshots straight from the kernel's scanout buffers.
//!
//! This library provides:
//! - CRTC and framebuffer enumeration over raw DRM/KMS ioctls
//! - Read-only mapping of scanout memory via dumb buffers or GEM names
//! - BGRX to RGB row conversion and streaming JPEG encoding
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────┐    ┌─────────────────┐    ┌──────────────┐
//! │ Resolve outputs │───▶│ Export + map │───▶│ Convert rows    │───▶│ JPEG encode  │
//! │ (CRTC -> FB)    │    │ (dumb / GEM) │    │ (BGRX -> RGB)   │    │ (file)       │
//! └─────────────────┘    └──────────────┘    └─────────────────┘    └──────────────┘
//! ```

pub mod capture;
pub mod config;
pub mod device;
pub mod encode;
pub mod error;
pub mod export;
pub mod formats;
pub mod types;

pub use capture::{resolve_outputs, run, run_on, CaptureSession};
pub use config::{CaptureConfig, ConfigFile};
pub use device::{Card, KmsDevice};
pub use error::{KmsshotError, Result};
pub use export::ExportStrategy;
pub use types::{CaptureReport, CapturedImage, ResolvedOutput, ScanoutBuffer};
