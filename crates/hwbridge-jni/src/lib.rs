// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Native method surface for `UsbMidiDevice` and `FingerprintService`.
//
// `surface` holds the int-in, int-out behaviour of every native method and
// builds on any host. The `android` module registers those methods with the
// VM and marshals Java objects around them.

pub mod surface;

#[cfg(target_os = "android")]
pub mod android;

pub use surface::{FingerprintNatives, NO_HAL, UsbMidiNatives};
