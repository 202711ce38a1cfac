// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// `HARDWARE_MODULE_API_VERSION(maj, min)` from `hardware/hardware.h`.
pub const fn hardware_module_api_version(major: u8, minor: u8) -> u32 {
    ((major as u32) << 8) | minor as u32
}

/// Device API version the fingerprint bridge is written against.
pub const FINGERPRINT_API_VERSION: u32 = hardware_module_api_version(2, 0);

/// Well-known identifier of the fingerprint HAL module.
pub const FINGERPRINT_HARDWARE_MODULE_ID: &str = "fingerprint";

/// Persistent bridge settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub midi: MidiConfig,
    pub fingerprint: FingerprintConfig,
}

impl BridgeConfig {
    /// Read a JSON configuration file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), raw)?;
        Ok(())
    }
}

/// Raw-MIDI access settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiConfig {
    /// Directory holding the ALSA `controlC*` and `midiC*D*` nodes.
    pub dev_root: PathBuf,
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            dev_root: PathBuf::from("/dev/snd"),
        }
    }
}

/// What `openHal` does when the device reports an unexpected API version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionPolicy {
    /// Keep the device, log a warning and report the mismatch to the caller.
    #[default]
    Warn,
    /// Close the device and fail the open.
    Reject,
}

/// What `closeHal` does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosePolicy {
    /// Report "not supported" and keep the device open.
    #[default]
    Unsupported,
    /// Detach the notify callback, close the device and clear the handle.
    Release,
}

/// Fingerprint HAL settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    /// Module identifier resolved through the HAL registry.
    pub module_id: String,
    /// Device API version this bridge expects.
    pub expected_version: u32,
    pub version_policy: VersionPolicy,
    pub close_policy: ClosePolicy,
    /// Name given to the consumer thread that delivers notifications.
    pub looper_thread: String,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            module_id: FINGERPRINT_HARDWARE_MODULE_ID.into(),
            expected_version: FINGERPRINT_API_VERSION,
            version_policy: VersionPolicy::default(),
            close_policy: ClosePolicy::default(),
            looper_thread: "fingerprint-looper".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_version_encoding() {
        assert_eq!(FINGERPRINT_API_VERSION, 0x0200);
        assert_eq!(hardware_module_api_version(1, 3), 0x0103);
    }

    #[test]
    fn defaults_keep_legacy_behaviour() {
        let config = BridgeConfig::default();
        assert_eq!(config.midi.dev_root, PathBuf::from("/dev/snd"));
        assert_eq!(config.fingerprint.module_id, "fingerprint");
        assert_eq!(config.fingerprint.version_policy, VersionPolicy::Warn);
        assert_eq!(config.fingerprint.close_policy, ClosePolicy::Unsupported);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.json");
        std::fs::write(
            &path,
            r#"{ "fingerprint": { "close_policy": "release", "version_policy": "reject" } }"#,
        )
        .unwrap();

        let config = BridgeConfig::load(&path).unwrap();
        assert_eq!(config.fingerprint.close_policy, ClosePolicy::Release);
        assert_eq!(config.fingerprint.version_policy, VersionPolicy::Reject);
        assert_eq!(config.fingerprint.expected_version, FINGERPRINT_API_VERSION);
        assert_eq!(config.midi, MidiConfig::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.json");
        let mut config = BridgeConfig::default();
        config.midi.dev_root = dir.path().to_path_buf();
        config.save(&path).unwrap();

        assert_eq!(BridgeConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn malformed_file_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            BridgeConfig::load(&path),
            Err(crate::BridgeError::Serialization(_))
        ));
    }
}
