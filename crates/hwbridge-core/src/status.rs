// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Mapping from typed bridge errors back to the integer status contract the
// managed service expects.
//
// The Java side of both services predates the typed API: it reads plain
// `int` results where `0` means success and negative values are errno-style
// failures. The subdevice count query uses its own sentinel scheme.

use crate::error::{BridgeError, Result};

/// Status reported for a successful call.
pub const STATUS_OK: i32 = 0;

/// Sentinel returned by the subdevice count query when the ioctl itself fails.
pub const COUNT_QUERY_FAILED: i32 = -1;

/// Sentinel returned by the subdevice count query when the control node
/// cannot be opened.
pub const COUNT_NODE_UNAVAILABLE: i32 = 0;

/// Convert an error into the negative status the managed caller expects.
///
/// `OperationFailed` carries the raw HAL/ioctl status through unchanged so
/// the caller can still interpret vendor codes.
pub fn status_code(err: &BridgeError) -> i32 {
    match err {
        BridgeError::OperationFailed { status, .. } => *status,
        BridgeError::NotInitialized(_) => -libc::ENODEV,
        BridgeError::Unsupported => -libc::ENOSYS,
        BridgeError::ResourceUnavailable(_) => -libc::ENOENT,
        BridgeError::InvalidArgument(_) => -libc::EINVAL,
        BridgeError::VersionMismatch { .. } => -libc::EPROTO,
        BridgeError::Io(e) => e.raw_os_error().map(|code| -code).unwrap_or(-libc::EIO),
        BridgeError::Serialization(_) | BridgeError::Bridge(_) => -libc::EIO,
    }
}

/// Collapse a unit result into a legacy status.
pub fn to_status(result: &Result<()>) -> i32 {
    match result {
        Ok(()) => STATUS_OK,
        Err(e) => status_code(e),
    }
}

/// Legacy encoding of the subdevice count query.
///
/// The count on success, `0` when the control node could not be opened and
/// `-1` when the query failed after a successful open.
pub fn subdevice_count_code(result: &Result<u32>) -> i32 {
    match result {
        Ok(count) => i32::try_from(*count).unwrap_or(i32::MAX),
        Err(e) if e.is_unavailable() => COUNT_NODE_UNAVAILABLE,
        Err(_) => COUNT_QUERY_FAILED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hal_status_passes_through() {
        let err = BridgeError::failed("enroll", -3);
        assert_eq!(status_code(&err), -3);
    }

    #[test]
    fn not_initialized_is_enodev() {
        let err = BridgeError::NotInitialized("fingerprint HAL");
        assert_eq!(status_code(&err), -libc::ENODEV);
    }

    #[test]
    fn unsupported_is_enosys() {
        assert_eq!(status_code(&BridgeError::Unsupported), -libc::ENOSYS);
        assert_eq!(to_status(&Err(BridgeError::Unsupported)), -libc::ENOSYS);
        assert_eq!(to_status(&Ok(())), STATUS_OK);
    }

    #[test]
    fn io_error_keeps_errno() {
        let err = BridgeError::Io(std::io::Error::from_raw_os_error(libc::EACCES));
        assert_eq!(status_code(&err), -libc::EACCES);
    }

    #[test]
    fn count_sentinels() {
        assert_eq!(subdevice_count_code(&Ok(4)), 4);
        assert_eq!(subdevice_count_code(&Ok(0)), 0);
        let missing = Err(BridgeError::ResourceUnavailable("/dev/snd/controlC9".into()));
        assert_eq!(subdevice_count_code(&missing), COUNT_NODE_UNAVAILABLE);
        let ioctl = Err(BridgeError::failed("SNDRV_CTL_IOCTL_RAWMIDI_INFO", -libc::ENXIO));
        assert_eq!(subdevice_count_code(&ioctl), COUNT_QUERY_FAILED);
    }
}
