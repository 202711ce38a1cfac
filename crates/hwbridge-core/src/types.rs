// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// MIDI device description shared between the raw-MIDI access layer and the
// service that publishes devices to clients.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BridgeError, Result};

/// Well-known keys of [`MidiDeviceInfo::properties`].
pub mod property {
    pub const NAME: &str = "name";
    pub const MANUFACTURER: &str = "manufacturer";
    pub const PRODUCT: &str = "product";
    pub const SERIAL_NUMBER: &str = "serial_number";
    pub const USB_DEVICE: &str = "usb_device";
    pub const BLUETOOTH_DEVICE: &str = "bluetooth_device";
    pub const ALSA_CARD: &str = "alsa_card";
    pub const ALSA_DEVICE: &str = "alsa_device";
    pub const SERVICE_INFO: &str = "service_info";
}

/// How a MIDI device is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MidiDeviceType {
    Usb,
    Virtual,
    Bluetooth,
}

impl MidiDeviceType {
    /// Integer code used on the managed side.
    pub fn code(self) -> i32 {
        match self {
            Self::Usb => 1,
            Self::Virtual => 2,
            Self::Bluetooth => 3,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::Usb),
            2 => Some(Self::Virtual),
            3 => Some(Self::Bluetooth),
            _ => None,
        }
    }
}

/// Direction of a MIDI port, seen from the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortType {
    Input,
    Output,
}

impl PortType {
    pub fn code(self) -> i32 {
        match self {
            Self::Input => 1,
            Self::Output => 2,
        }
    }
}

/// Description of one port of a MIDI device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    pub port_type: PortType,
    pub port_number: usize,
    /// Empty when the device did not name the port.
    pub name: String,
}

/// Description of a MIDI device as published to clients.
///
/// Two descriptions are the same device when their `id` matches; the rest
/// of the record is informational.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MidiDeviceInfo {
    pub device_type: MidiDeviceType,
    /// Unique id assigned by the MIDI service.
    pub id: i32,
    input_port_names: Vec<Option<String>>,
    output_port_names: Vec<Option<String>>,
    pub properties: BTreeMap<String, Value>,
    pub is_private: bool,
}

impl MidiDeviceInfo {
    /// Build a description. Missing port name lists are padded with
    /// unnamed ports up to the given counts.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device_type: MidiDeviceType,
        id: i32,
        input_port_count: usize,
        output_port_count: usize,
        input_port_names: Option<Vec<Option<String>>>,
        output_port_names: Option<Vec<Option<String>>>,
        properties: BTreeMap<String, Value>,
        is_private: bool,
    ) -> Self {
        Self {
            device_type,
            id,
            input_port_names: pad_names(input_port_names, input_port_count),
            output_port_names: pad_names(output_port_names, output_port_count),
            properties,
            is_private,
        }
    }

    pub fn input_port_count(&self) -> usize {
        self.input_port_names.len()
    }

    pub fn output_port_count(&self) -> usize {
        self.output_port_names.len()
    }

    pub fn input_port_info(&self, port_number: usize) -> Result<PortInfo> {
        port_info(&self.input_port_names, PortType::Input, port_number)
    }

    pub fn output_port_info(&self, port_number: usize) -> Result<PortInfo> {
        port_info(&self.output_port_names, PortType::Output, port_number)
    }

    /// String-valued property, if present.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }
}

fn pad_names(names: Option<Vec<Option<String>>>, count: usize) -> Vec<Option<String>> {
    let mut names = names.unwrap_or_default();
    names.resize(count, None);
    names
}

fn port_info(
    names: &[Option<String>],
    port_type: PortType,
    port_number: usize,
) -> Result<PortInfo> {
    let name = names.get(port_number).ok_or_else(|| {
        BridgeError::InvalidArgument(format!(
            "port number {port_number} out of range (0..{})",
            names.len()
        ))
    })?;
    Ok(PortInfo {
        port_type,
        port_number,
        name: name.clone().unwrap_or_default(),
    })
}

impl PartialEq for MidiDeviceInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MidiDeviceInfo {}

impl Hash for MidiDeviceInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for MidiDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MidiDeviceInfo[type={:?}, id={}, inputs={}, outputs={}, private={}",
            self.device_type,
            self.id,
            self.input_port_count(),
            self.output_port_count(),
            self.is_private
        )?;
        if let Some(name) = self.property_str(property::NAME) {
            write!(f, ", name={name}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usb_info(id: i32) -> MidiDeviceInfo {
        let mut properties = BTreeMap::new();
        properties.insert(property::NAME.into(), Value::from("Keystation"));
        properties.insert(property::ALSA_CARD.into(), Value::from(1));
        MidiDeviceInfo::new(
            MidiDeviceType::Usb,
            id,
            2,
            1,
            Some(vec![Some("in-a".into())]),
            None,
            properties,
            false,
        )
    }

    #[test]
    fn port_names_are_padded() {
        let info = usb_info(7);
        assert_eq!(info.input_port_count(), 2);
        assert_eq!(info.input_port_info(0).unwrap().name, "in-a");
        assert_eq!(info.input_port_info(1).unwrap().name, "");
        let out = info.output_port_info(0).unwrap();
        assert_eq!(out.port_type, PortType::Output);
        assert_eq!(out.name, "");
    }

    #[test]
    fn port_out_of_range_is_invalid_argument() {
        let info = usb_info(7);
        assert!(matches!(
            info.input_port_info(2),
            Err(BridgeError::InvalidArgument(_))
        ));
        assert!(info.output_port_info(1).is_err());
    }

    #[test]
    fn identity_is_the_id() {
        let a = usb_info(3);
        let mut b = usb_info(3);
        b.is_private = true;
        assert_eq!(a, b);
        assert_ne!(a, usb_info(4));
    }

    #[test]
    fn type_codes() {
        assert_eq!(MidiDeviceType::Usb.code(), 1);
        assert_eq!(MidiDeviceType::from_code(3), Some(MidiDeviceType::Bluetooth));
        assert_eq!(MidiDeviceType::from_code(9), None);
        assert_eq!(PortType::Output.code(), 2);
    }

    #[test]
    fn display_includes_name() {
        let text = usb_info(5).to_string();
        assert!(text.contains("id=5"));
        assert!(text.contains("name=Keystation"));
    }
}
