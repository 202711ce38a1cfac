// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Node backend for the raw-MIDI access layer.
//
// The access layer only needs three primitives: open a node, and two
// control-plane queries on an open control node. Keeping them behind a
// trait lets tests account for every handle the layer opens and closes.

use std::fs::OpenOptions;
use std::io;
use std::os::fd::{AsRawFd, OwnedFd};
use std::path::Path;

use crate::alsa::{self, RawMidiInfo};

/// Primitive operations on ALSA device nodes.
pub trait SndNodes {
    /// An open node. Dropping it closes the node.
    type Node;

    /// Open `path` read/write.
    fn open_node(&self, path: &Path) -> io::Result<Self::Node>;

    /// Rawmidi info for `device` through an open control node.
    fn rawmidi_info(&self, control: &Self::Node, device: u32) -> io::Result<RawMidiInfo>;

    /// Next rawmidi device after `after`, `-1` when there is none.
    fn next_device(&self, control: &Self::Node, after: i32) -> io::Result<i32>;
}

/// The real `/dev/snd` nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DevSnd;

impl SndNodes for DevSnd {
    type Node = OwnedFd;

    fn open_node(&self, path: &Path) -> io::Result<OwnedFd> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(file.into())
    }

    fn rawmidi_info(&self, control: &OwnedFd, device: u32) -> io::Result<RawMidiInfo> {
        Ok(alsa::query_info(control.as_raw_fd(), device)?)
    }

    fn next_device(&self, control: &OwnedFd, after: i32) -> io::Result<i32> {
        Ok(alsa::next_device(control.as_raw_fd(), after)?)
    }
}
