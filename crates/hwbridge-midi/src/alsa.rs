// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ALSA control-plane ioctls used by the raw-MIDI access layer.
//
// From <sound/asound.h>:
//   #define SNDRV_CTL_IOCTL_RAWMIDI_NEXT_DEVICE _IOWR('U', 0x40, int)
//   #define SNDRV_CTL_IOCTL_RAWMIDI_INFO        _IOWR('U', 0x41, struct snd_rawmidi_info)

use std::ffi::CStr;
use std::os::fd::RawFd;

use libc::{c_int, c_uchar, c_uint};

const SNDRV_CTL_MAGIC: u8 = b'U';
const SNDRV_CTL_RAWMIDI_NEXT_DEVICE: u8 = 0x40;
const SNDRV_CTL_RAWMIDI_INFO: u8 = 0x41;

/// `SNDRV_RAWMIDI_STREAM_OUTPUT`; the stream the info query is made for.
pub const RAWMIDI_STREAM_OUTPUT: c_int = 0;

/// Kernel layout of `struct snd_rawmidi_info`.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct SndRawmidiInfo {
    pub device: c_uint,
    pub subdevice: c_uint,
    pub stream: c_int,
    pub card: c_int,
    pub flags: c_uint,
    pub id: [c_uchar; 64],
    pub name: [c_uchar; 80],
    pub subname: [c_uchar; 32],
    pub subdevices_count: c_uint,
    pub subdevices_avail: c_uint,
    pub reserved: [c_uchar; 64],
}

impl SndRawmidiInfo {
    /// Zeroed request for `device`, as the driver expects.
    pub fn request(device: u32) -> Self {
        Self {
            device,
            subdevice: 0,
            stream: RAWMIDI_STREAM_OUTPUT,
            card: 0,
            flags: 0,
            id: [0; 64],
            name: [0; 80],
            subname: [0; 32],
            subdevices_count: 0,
            subdevices_avail: 0,
            reserved: [0; 64],
        }
    }
}

nix::ioctl_readwrite!(
    ctl_rawmidi_next_device,
    SNDRV_CTL_MAGIC,
    SNDRV_CTL_RAWMIDI_NEXT_DEVICE,
    c_int
);
nix::ioctl_readwrite!(
    ctl_rawmidi_info,
    SNDRV_CTL_MAGIC,
    SNDRV_CTL_RAWMIDI_INFO,
    SndRawmidiInfo
);

/// Safe copy of a rawmidi info reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMidiInfo {
    pub card: i32,
    pub device: u32,
    pub id: String,
    pub name: String,
    pub subname: String,
    pub subdevices_count: u32,
    pub subdevices_avail: u32,
}

impl From<&SndRawmidiInfo> for RawMidiInfo {
    fn from(raw: &SndRawmidiInfo) -> Self {
        Self {
            card: raw.card,
            device: raw.device,
            id: c_text(&raw.id),
            name: c_text(&raw.name),
            subname: c_text(&raw.subname),
            subdevices_count: raw.subdevices_count,
            subdevices_avail: raw.subdevices_avail,
        }
    }
}

/// NUL-terminated fixed buffer to `String`; unterminated buffers are taken whole.
fn c_text(buf: &[u8]) -> String {
    match CStr::from_bytes_until_nul(buf) {
        Ok(text) => text.to_string_lossy().into_owned(),
        Err(_) => String::from_utf8_lossy(buf).into_owned(),
    }
}

/// Issue `SNDRV_CTL_IOCTL_RAWMIDI_INFO` for `device` on an open control node.
pub fn query_info(control: RawFd, device: u32) -> nix::Result<RawMidiInfo> {
    let mut info = SndRawmidiInfo::request(device);
    // SAFETY: `info` is a properly sized, writable `snd_rawmidi_info` that
    // lives for the duration of the call.
    unsafe { ctl_rawmidi_info(control, &mut info) }?;
    Ok(RawMidiInfo::from(&info))
}

/// Issue `SNDRV_CTL_IOCTL_RAWMIDI_NEXT_DEVICE`.
///
/// Returns the next rawmidi device after `after` (`-1` starts the walk), or
/// `-1` once the card has no more devices.
pub fn next_device(control: RawFd, after: i32) -> nix::Result<i32> {
    let mut device: c_int = after;
    // SAFETY: `device` is a writable int for the duration of the call.
    unsafe { ctl_rawmidi_next_device(control, &mut device) }?;
    Ok(device)
}
