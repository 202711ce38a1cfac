// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// hwbridge: Core types, error definitions and configuration shared across
// the MIDI and fingerprint bridges.

pub mod config;
pub mod error;
pub mod status;
pub mod types;

pub use config::BridgeConfig;
pub use error::BridgeError;
pub use types::*;
