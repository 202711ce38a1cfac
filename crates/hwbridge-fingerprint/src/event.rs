// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Event records carried from the HAL notify callback to the listener.

use crate::hal::{HalMessage, msg_type};

/// Kinds of notification the relay forwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Error,
    Acquired,
    Processed,
    Enrolling,
    Removed,
}

impl EventKind {
    /// Message type code the managed listener receives.
    pub fn code(self) -> i32 {
        match self {
            Self::Error => msg_type::ERROR,
            Self::Acquired => msg_type::ACQUIRED,
            Self::Processed => msg_type::PROCESSED,
            Self::Enrolling => msg_type::TEMPLATE_ENROLLING,
            Self::Removed => msg_type::TEMPLATE_REMOVED,
        }
    }
}

/// One notification, packaged for delivery on the consumer thread.
///
/// Unused payload fields are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerprintEvent {
    kind: EventKind,
    args: [u32; 3],
}

impl FingerprintEvent {
    pub fn new(kind: EventKind, arg1: u32, arg2: u32, arg3: u32) -> Self {
        Self {
            kind,
            args: [arg1, arg2, arg3],
        }
    }

    /// Package a HAL message. Unknown message types yield `None`.
    pub fn from_hal(msg: &HalMessage) -> Option<Self> {
        let event = match *msg {
            HalMessage::Error { error } => Self::new(EventKind::Error, error, 0, 0),
            HalMessage::Acquired { acquired_info } => {
                Self::new(EventKind::Acquired, acquired_info, 0, 0)
            }
            HalMessage::Processed { finger } => {
                Self::new(EventKind::Processed, finger.fid, finger.gid, 0)
            }
            HalMessage::TemplateEnrolling {
                finger,
                samples_remaining,
            } => Self::new(EventKind::Enrolling, finger.fid, finger.gid, samples_remaining),
            HalMessage::TemplateRemoved { finger } => {
                Self::new(EventKind::Removed, finger.fid, finger.gid, 0)
            }
            HalMessage::Other { .. } => return None,
        };
        Some(event)
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn arg1(&self) -> u32 {
        self.args[0]
    }

    pub fn arg2(&self) -> u32 {
        self.args[1]
    }

    pub fn arg3(&self) -> u32 {
        self.args[2]
    }

    /// `(type, arg1, arg2, arg3)` as the managed `notify(IIII)` expects.
    ///
    /// Payloads are reinterpreted bit for bit as signed ints.
    pub fn notify_args(&self) -> (i32, i32, i32, i32) {
        (
            self.kind.code(),
            self.args[0] as i32,
            self.args[1] as i32,
            self.args[2] as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::FingerId;

    #[test]
    fn payload_shapes() {
        let finger = FingerId::new(7, 2);

        let e = FingerprintEvent::from_hal(&HalMessage::Error { error: 5 }).unwrap();
        assert_eq!(e.notify_args(), (-1, 5, 0, 0));

        let e = FingerprintEvent::from_hal(&HalMessage::Acquired { acquired_info: 3 }).unwrap();
        assert_eq!(e.notify_args(), (1, 3, 0, 0));

        let e = FingerprintEvent::from_hal(&HalMessage::Processed { finger }).unwrap();
        assert_eq!(e.notify_args(), (2, 7, 2, 0));

        let e = FingerprintEvent::from_hal(&HalMessage::TemplateEnrolling {
            finger,
            samples_remaining: 4,
        })
        .unwrap();
        assert_eq!(e.kind(), EventKind::Enrolling);
        assert_eq!(e.notify_args(), (3, 7, 2, 4));

        let e = FingerprintEvent::from_hal(&HalMessage::TemplateRemoved { finger }).unwrap();
        assert_eq!(e.notify_args(), (4, 7, 2, 0));
    }

    #[test]
    fn unknown_type_is_not_packaged() {
        assert!(FingerprintEvent::from_hal(&HalMessage::Other { msg_type: 99 }).is_none());
    }

    #[test]
    fn large_payloads_keep_their_bits() {
        let e = FingerprintEvent::new(EventKind::Processed, u32::MAX, 0x8000_0000, 0);
        assert_eq!(e.notify_args(), (2, -1, i32::MIN, 0));
    }
}
