// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// hwbridge: USB MIDI raw-MIDI subdevice access over ALSA device nodes.

pub mod alsa;
pub mod nodes;
pub mod rawmidi;

pub use alsa::RawMidiInfo;
pub use nodes::{DevSnd, SndNodes};
pub use rawmidi::RawMidi;
