// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fingerprint HAL contract.
//
// A vendor module is resolved by identifier, opened into a device, and the
// device then accepts a notify callback plus the enroll/authenticate/remove
// operations. Every device operation answers with a raw integer status that
// the bridge passes back untouched.

use std::sync::Arc;

use thiserror::Error;

/// Identity of an enrolled template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FingerId {
    /// Finger id within the group.
    pub fid: u32,
    /// Group (user) the finger belongs to.
    pub gid: u32,
}

impl FingerId {
    pub fn new(fid: u32, gid: u32) -> Self {
        Self { fid, gid }
    }
}

/// Raw `fingerprint_msg_type` values.
pub mod msg_type {
    pub const ERROR: i32 = -1;
    pub const ACQUIRED: i32 = 1;
    pub const PROCESSED: i32 = 2;
    pub const TEMPLATE_ENROLLING: i32 = 3;
    pub const TEMPLATE_REMOVED: i32 = 4;
}

/// A notification as the HAL delivers it, before the relay looks at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalMessage {
    Error { error: u32 },
    Acquired { acquired_info: u32 },
    Processed { finger: FingerId },
    TemplateEnrolling {
        finger: FingerId,
        samples_remaining: u32,
    },
    TemplateRemoved { finger: FingerId },
    /// A message type this bridge does not understand.
    Other { msg_type: i32 },
}

impl HalMessage {
    pub fn msg_type(&self) -> i32 {
        match self {
            Self::Error { .. } => msg_type::ERROR,
            Self::Acquired { .. } => msg_type::ACQUIRED,
            Self::Processed { .. } => msg_type::PROCESSED,
            Self::TemplateEnrolling { .. } => msg_type::TEMPLATE_ENROLLING,
            Self::TemplateRemoved { .. } => msg_type::TEMPLATE_REMOVED,
            Self::Other { msg_type } => *msg_type,
        }
    }
}

/// Callback the device invokes, from any thread it owns, for every message.
pub type NotifyFn = Arc<dyn Fn(HalMessage) + Send + Sync>;

/// An open fingerprint device.
///
/// Implementations must be callable from several threads at once: service
/// calls arrive on binder threads while the vendor driver notifies from
/// its own workers.
pub trait FingerprintDevice: Send + Sync {
    /// Device API version, compared against `HARDWARE_MODULE_API_VERSION(2, 0)`.
    fn version(&self) -> u32;

    /// Install (or with `None`, detach) the notify callback.
    fn set_notify(&self, notify: Option<NotifyFn>) -> i32;

    /// Start enrolling a new template for `group_id`.
    fn enroll(&self, group_id: u32, timeout_sec: u32) -> i32;

    /// Stop a pending enrollment.
    fn enroll_cancel(&self) -> i32;

    /// Delete an enrolled template.
    fn remove(&self, finger: FingerId) -> i32;

    /// Start matching against the templates of `group_id`.
    fn authenticate(&self, operation_id: u64, group_id: u32) -> i32;

    /// Release the device.
    fn close(&self) -> i32;
}

/// Why a module failed to produce a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HalOpenError {
    #[error("module has no open method")]
    NoOpenMethod,
    #[error("open failed with status {0}")]
    Failed(i32),
}

/// A loadable HAL module.
pub trait HalModule: Send + Sync {
    /// Identifier the module is registered under.
    fn id(&self) -> &str;

    /// Open the device the module drives.
    fn open(&self) -> Result<Arc<dyn FingerprintDevice>, HalOpenError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_types_match_hal_header() {
        assert_eq!(HalMessage::Error { error: 3 }.msg_type(), -1);
        assert_eq!(HalMessage::Acquired { acquired_info: 0 }.msg_type(), 1);
        let finger = FingerId::new(1, 0);
        assert_eq!(HalMessage::Processed { finger }.msg_type(), 2);
        assert_eq!(
            HalMessage::TemplateEnrolling {
                finger,
                samples_remaining: 2,
            }
            .msg_type(),
            3
        );
        assert_eq!(HalMessage::TemplateRemoved { finger }.msg_type(), 4);
        assert_eq!(HalMessage::Other { msg_type: 42 }.msg_type(), 42);
    }
}
