//! Integration tests for error handling

use kmsshot_core::error::{ExportStage, KmsshotError, ResultExt};
use std::io;
use std::path::PathBuf;

fn os_error(errno: i32) -> io::Error {
    io::Error::from_raw_os_error(errno)
}

#[test]
fn test_error_context_chaining() {
    let base_error = KmsshotError::encoder("stream finished after 3 of 4 rows");
    let with_context = base_error.with_context("Encoding framebuffer 57");

    let msg = format!("{}", with_context);
    assert!(msg.contains("Encoding framebuffer 57"));
    assert!(msg.contains("3 of 4 rows"));
}

#[test]
fn test_error_context_preserves_hint() {
    let base_error = KmsshotError::config("bad quality");
    let hint_before = base_error.user_hint();

    let with_context = base_error.with_context("Loading config");
    assert_eq!(hint_before, with_context.user_hint());
}

#[test]
fn test_result_ext_context() {
    let result: Result<(), KmsshotError> = Err(KmsshotError::Resources(os_error(libc::EINVAL)));
    let err = result.context("Enumerating CRTCs").unwrap_err();

    assert!(format!("{}", err).contains("Enumerating CRTCs"));
    // Context does not hide fatality or the errno
    assert!(err.is_fatal());
    assert_eq!(err.exit_code(), -libc::EINVAL);
}

#[test]
fn test_fatal_errors() {
    let open = KmsshotError::DeviceOpen {
        path: PathBuf::from("/dev/dri/card0"),
        source: os_error(libc::EACCES),
    };
    assert!(open.is_fatal());
    assert_eq!(open.exit_code(), -libc::EACCES);

    let resources = KmsshotError::Resources(os_error(libc::EOPNOTSUPP));
    assert!(resources.is_fatal());
    assert_eq!(resources.exit_code(), -libc::EOPNOTSUPP);
}

#[test]
fn test_per_buffer_errors_are_not_fatal() {
    let errors = [
        KmsshotError::Resolve {
            crtc_id: 31,
            source: os_error(libc::ENOENT),
        },
        KmsshotError::Export {
            stage: ExportStage::Flink,
            handle: 7,
            source: os_error(libc::EPERM),
        },
        KmsshotError::MappingTooSmall {
            fb_id: 57,
            mapped: 16,
            required: 32,
        },
        KmsshotError::UnsupportedFormat {
            fb_id: 57,
            depth: 16,
            bpp: 16,
        },
    ];
    for err in &errors {
        assert!(!err.is_fatal(), "{} should not be fatal", err);
    }
}

#[test]
fn test_exit_code_without_errno() {
    assert_eq!(KmsshotError::encoder("boom").exit_code(), -1);
    let custom = KmsshotError::Resources(io::Error::other("no errno"));
    assert_eq!(custom.exit_code(), -1);
}

#[test]
fn test_user_hints() {
    let err = KmsshotError::DeviceOpen {
        path: PathBuf::from("/dev/dri/card0"),
        source: os_error(libc::EACCES),
    };
    assert!(err.user_hint().unwrap().contains("video"));

    let err = KmsshotError::Export {
        stage: ExportStage::MapOffset,
        handle: 7,
        source: os_error(libc::EINVAL),
    };
    assert!(err.user_hint().unwrap().contains("--strategy"));

    let err = KmsshotError::config("test");
    assert!(err.user_hint().unwrap().contains("config.toml"));

    assert!(KmsshotError::encoder("test").user_hint().is_none());
}

#[test]
fn test_error_display_format() {
    let err = KmsshotError::Resources(os_error(libc::EINVAL));
    assert!(format!("{}", err).starts_with("Unable to retrieve DRM resources"));

    let err = KmsshotError::Export {
        stage: ExportStage::Flink,
        handle: 7,
        source: os_error(libc::EPERM),
    };
    assert!(format!("{}", err).starts_with("Buffer export failed at GEM flink for handle 7"));

    let err = KmsshotError::encoder("Invalid quality");
    assert_eq!(format!("{}", err), "Encoder error: Invalid quality");
}

#[test]
fn test_io_error_conversion() {
    let io_err = io::Error::new(io::ErrorKind::NotFound, "File not found");
    let err: KmsshotError = io_err.into();

    let msg = format!("{}", err);
    assert!(msg.contains("I/O error"));
    assert!(msg.contains("File not found"));
}
