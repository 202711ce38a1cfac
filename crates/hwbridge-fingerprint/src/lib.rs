// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fingerprint HAL bridge.
//
// The HAL notifies from threads it owns; the service listener must only be
// called from one known thread. `relay` carries each notification across as
// an immutable `FingerprintEvent` and `bridge` ties the relay to the device
// operations.

pub mod bridge;
pub mod event;
pub mod hal;
pub mod registry;
pub mod relay;
pub mod sim;

pub use bridge::{FingerprintBridge, HalHandle, OpenedHal, VersionMismatch};
pub use event::{EventKind, FingerprintEvent};
pub use hal::{FingerId, FingerprintDevice, HalMessage, HalModule, HalOpenError, NotifyFn};
pub use registry::ModuleRegistry;
pub use relay::{EventRelay, FingerprintListener, Looper, LooperHandle};
