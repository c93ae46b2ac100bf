//! Error types for kmsshot

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using KmsshotError
pub type Result<T> = std::result::Result<T, KmsshotError>;

/// Step of a buffer export that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    /// Turning the handle into a global GEM name
    Flink,
    /// Reopening a GEM name in this process
    Open,
    /// Querying the fake mmap offset for the buffer
    MapOffset,
    /// The mmap call itself
    Mmap,
}

impl std::fmt::Display for ExportStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flink => write!(f, "GEM flink"),
            Self::Open => write!(f, "GEM open"),
            Self::MapOffset => write!(f, "mapping offset query"),
            Self::Mmap => write!(f, "mmap"),
        }
    }
}

/// Main error type for kmsshot operations
#[derive(Debug, Error)]
pub enum KmsshotError {
    /// The DRM device node could not be opened
    #[error("Unable to open DRM device {}: {source}", path.display())]
    DeviceOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The top-level mode resources could not be retrieved
    #[error("Unable to retrieve DRM resources: {0}")]
    Resources(#[source] std::io::Error),

    /// A CRTC could not be resolved to its framebuffer
    #[error("Unable to resolve framebuffer for CRTC {crtc_id}: {source}")]
    Resolve {
        crtc_id: u32,
        #[source]
        source: std::io::Error,
    },

    /// The framebuffer does not use 32 bits per pixel
    #[error("Unsupported pixel format on framebuffer {fb_id}: depth {depth}, {bpp} bpp")]
    UnsupportedFormat { fb_id: u32, depth: u32, bpp: u32 },

    /// The framebuffer geometry is inconsistent
    #[error("Invalid framebuffer: {0}")]
    InvalidBuffer(String),

    /// Exporting or mapping the buffer memory failed
    #[error("Buffer export failed at {stage} for handle {handle}: {source}")]
    Export {
        stage: ExportStage,
        handle: u32,
        #[source]
        source: std::io::Error,
    },

    /// The mapping does not cover pitch * height bytes
    #[error("Mapping of framebuffer {fb_id} is {mapped} bytes, need {required}")]
    MappingTooSmall {
        fb_id: u32,
        mapped: usize,
        required: usize,
    },

    /// The output image could not be created
    #[error("Unable to open {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Encoder error
    #[error("Encoder error: {0}")]
    Encoder(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<KmsshotError>,
    },
}

impl KmsshotError {
    /// Create an encoder error
    pub fn encoder(msg: impl Into<String>) -> Self {
        Self::Encoder(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid buffer error
    pub fn invalid_buffer(msg: impl Into<String>) -> Self {
        Self::InvalidBuffer(msg.into())
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through context wrappers
    pub fn root(&self) -> &KmsshotError {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether this error aborts the whole run rather than a single buffer
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.root(),
            Self::DeviceOpen { .. } | Self::Resources(_)
        )
    }

    /// Underlying OS error number, if any
    pub fn raw_os_error(&self) -> Option<i32> {
        match self.root() {
            Self::DeviceOpen { source, .. }
            | Self::Resolve { source, .. }
            | Self::Export { source, .. }
            | Self::Output { source, .. } => source.raw_os_error(),
            Self::Resources(source) | Self::Io(source) => source.raw_os_error(),
            _ => None,
        }
    }

    /// Process exit code for this error: the negated errno when known
    pub fn exit_code(&self) -> i32 {
        match self.raw_os_error() {
            Some(errno) if errno > 0 => -errno,
            _ => -1,
        }
    }

    /// A short suggestion for the user, if one applies
    pub fn user_hint(&self) -> Option<&'static str> {
        match self.root() {
            Self::DeviceOpen { source, .. } => match source.kind() {
                std::io::ErrorKind::PermissionDenied => {
                    Some("Run as root or add your user to the 'video' group")
                }
                std::io::ErrorKind::NotFound => {
                    Some("Check the device path; try 'kmsshot list --device /dev/dri/card1'")
                }
                _ => Some("Make sure a DRM/KMS driver is loaded"),
            },
            Self::Resources(_) => Some("The device is not a KMS-capable primary node"),
            Self::Export { stage, .. } => match stage {
                ExportStage::Flink | ExportStage::Open => {
                    Some("Framebuffer handles are only visible to root or the DRM master")
                }
                ExportStage::MapOffset => {
                    Some("Try another export strategy: --strategy dumb or --strategy gem-name")
                }
                ExportStage::Mmap => None,
            },
            Self::UnsupportedFormat { .. } => {
                Some("Only 32 bits-per-pixel framebuffers can be captured")
            }
            Self::Output { .. } => Some("Check that the output directory exists and is writable"),
            Self::Config(_) => {
                Some("Check your config.toml; 'kmsshot config sample' prints a template")
            }
            _ => None,
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}
