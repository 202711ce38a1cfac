// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raw-MIDI subdevice access.
//
// A USB MIDI interface shows up as one ALSA rawmidi device with several
// subdevices (one per cable). The driver lets the same `midiC{card}D{device}`
// node be opened once per subdevice, so "opening the subdevices" means
// opening that node N times and handing the N handles to the caller.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, error, info, instrument};

use hwbridge_core::config::MidiConfig;
use hwbridge_core::error::{BridgeError, Result};
use hwbridge_core::types::{MidiDeviceInfo, MidiDeviceType, property};

use crate::alsa::RawMidiInfo;
use crate::nodes::{DevSnd, SndNodes};

/// Access to the rawmidi devices below one ALSA device directory.
#[derive(Debug, Clone)]
pub struct RawMidi<B = DevSnd> {
    root: PathBuf,
    backend: B,
}

impl RawMidi<DevSnd> {
    /// Real nodes below `root` (normally `/dev/snd`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_backend(root, DevSnd)
    }

    pub fn from_config(config: &MidiConfig) -> Self {
        Self::new(config.dev_root.clone())
    }
}

impl<B: SndNodes> RawMidi<B> {
    pub fn with_backend(root: impl Into<PathBuf>, backend: B) -> Self {
        Self {
            root: root.into(),
            backend,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `controlC{card}`: the control-plane node of a card.
    pub fn control_path(&self, card: u32) -> PathBuf {
        self.root.join(format!("controlC{card}"))
    }

    /// `midiC{card}D{device}`: the data node of a rawmidi device.
    pub fn data_path(&self, card: u32, device: u32) -> PathBuf {
        self.root.join(format!("midiC{card}D{device}"))
    }

    /// Open the control node of `card`.
    ///
    /// The node is closed when the returned handle is dropped, so every
    /// query below releases it on all return paths.
    fn open_control(&self, card: u32) -> Result<B::Node> {
        let path = self.control_path(card);
        self.backend.open_node(&path).map_err(|e| {
            error!(path = %path.display(), error = %e, "could not open control node");
            BridgeError::ResourceUnavailable(format!("{}: {e}", path.display()))
        })
    }

    /// Full rawmidi info for `device` on `card`.
    #[instrument(skip(self))]
    pub fn info(&self, card: u32, device: u32) -> Result<RawMidiInfo> {
        let control = self.open_control(card)?;
        self.backend
            .rawmidi_info(&control, device)
            .map_err(|e| {
                error!(
                    card,
                    device,
                    error = %e,
                    "SNDRV_CTL_IOCTL_RAWMIDI_INFO failed"
                );
                ioctl_failed("SNDRV_CTL_IOCTL_RAWMIDI_INFO", &e)
            })
    }

    /// Number of subdevices the driver reports for `device` on `card`.
    ///
    /// `ResourceUnavailable` when the control node cannot be opened,
    /// `OperationFailed` when the query itself fails.
    pub fn subdevice_count(&self, card: u32, device: u32) -> Result<u32> {
        let info = self.info(card, device)?;
        debug!(card, device, subdevices = info.subdevices_count, "subdevice count");
        Ok(info.subdevices_count)
    }

    /// All rawmidi device indices on `card`, in ascending order.
    #[instrument(skip(self))]
    pub fn devices(&self, card: u32) -> Result<Vec<u32>> {
        let control = self.open_control(card)?;
        let mut devices = Vec::new();
        let mut cursor = -1;
        loop {
            let next = self.backend.next_device(&control, cursor).map_err(|e| {
                error!(card, error = %e, "SNDRV_CTL_IOCTL_RAWMIDI_NEXT_DEVICE failed");
                ioctl_failed("SNDRV_CTL_IOCTL_RAWMIDI_NEXT_DEVICE", &e)
            })?;
            // The driver answers -1 when the walk is over; anything that
            // does not advance would loop forever.
            if next < 0 || next <= cursor {
                break;
            }
            devices.push(next as u32);
            cursor = next;
        }
        debug!(card, count = devices.len(), "rawmidi devices");
        Ok(devices)
    }

    /// Open `subdevice_count` independent handles on the data node.
    ///
    /// All or nothing: if any open fails, every handle opened so far is
    /// closed before the error is returned.
    #[instrument(skip(self))]
    pub fn open_subdevices(
        &self,
        card: u32,
        device: u32,
        subdevice_count: usize,
    ) -> Result<Vec<B::Node>> {
        let path = self.data_path(card, device);
        // Grows with successful opens; the count comes from the caller.
        let mut handles = Vec::new();
        for index in 0..subdevice_count {
            match self.backend.open_node(&path) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    error!(
                        path = %path.display(),
                        index,
                        opened = handles.len(),
                        error = %e,
                        "subdevice open failed, closing partial set"
                    );
                    drop(handles);
                    return Err(BridgeError::ResourceUnavailable(format!(
                        "{} (subdevice {index}): {e}",
                        path.display()
                    )));
                }
            }
        }
        info!(path = %path.display(), subdevices = handles.len(), "opened rawmidi subdevices");
        Ok(handles)
    }

    /// Describe a USB rawmidi device for publication to clients.
    ///
    /// Each subdevice is exposed as one input and one output port.
    pub fn describe(&self, id: i32, card: u32, device: u32) -> Result<MidiDeviceInfo> {
        let info = self.info(card, device)?;
        let ports = info.subdevices_count as usize;

        let mut properties = BTreeMap::new();
        if !info.name.is_empty() {
            properties.insert(property::NAME.to_string(), Value::from(info.name.clone()));
        }
        properties.insert(property::ALSA_CARD.to_string(), Value::from(card));
        properties.insert(property::ALSA_DEVICE.to_string(), Value::from(device));

        Ok(MidiDeviceInfo::new(
            MidiDeviceType::Usb,
            id,
            ports,
            ports,
            None,
            None,
            properties,
            false,
        ))
    }
}

fn ioctl_failed(operation: &'static str, e: &io::Error) -> BridgeError {
    let status = e.raw_os_error().map(|code| -code).unwrap_or(-libc::EIO);
    BridgeError::failed(operation, status)
}
