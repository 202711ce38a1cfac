// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Integer surface of the two services' native methods.
//
// The Java classes declare `native` methods that speak plain ints and
// sentinels. These types sit between those declarations and the typed
// bridges: arguments come in as JNI ints, results go back in the legacy
// encoding. Keeping this layer free of JNI types lets it run and be tested
// on any host; the Android module only marshals objects around it.

use std::sync::Arc;
use std::thread::ThreadId;

use tracing::{debug, warn};

use hwbridge_core::config::FingerprintConfig;
use hwbridge_core::error::{BridgeError, Result};
use hwbridge_core::status::{self, subdevice_count_code};
use hwbridge_fingerprint::{FingerprintBridge, FingerprintListener, LooperHandle, ModuleRegistry};
use hwbridge_midi::{DevSnd, RawMidi, SndNodes};

/// Value `nativeOpenHal` returns when no device could be opened.
pub const NO_HAL: i32 = 0;

fn index(name: &str, value: i32) -> Result<u32> {
    u32::try_from(value).map_err(|_| BridgeError::InvalidArgument(format!("{name} = {value}")))
}

/// Native methods of `com.android.server.usb.UsbMidiDevice`.
#[derive(Debug, Clone)]
pub struct UsbMidiNatives<B = DevSnd> {
    midi: RawMidi<B>,
}

impl<B: SndNodes> UsbMidiNatives<B> {
    pub fn new(midi: RawMidi<B>) -> Self {
        Self { midi }
    }

    pub fn midi(&self) -> &RawMidi<B> {
        &self.midi
    }

    /// `nativeGetSubdeviceCount(II)I`: the count, `0` when the control node
    /// is missing, `-1` when the query fails.
    pub fn get_subdevice_count(&self, card: i32, device: i32) -> i32 {
        let result = index("card", card)
            .and_then(|card| index("device", device).map(|device| (card, device)))
            .and_then(|(card, device)| self.midi.subdevice_count(card, device));
        subdevice_count_code(&result)
    }

    /// `nativeOpen(III)[Ljava/io/FileDescriptor;`: one handle per
    /// subdevice, or `None` (a null array) with nothing left open.
    pub fn open(&self, card: i32, device: i32, subdevice_count: i32) -> Option<Vec<B::Node>> {
        let result = index("card", card).and_then(|card| {
            let device = index("device", device)?;
            let count = index("subdevice_count", subdevice_count)?;
            self.midi.open_subdevices(card, device, count as usize)
        });
        match result {
            Ok(handles) => Some(handles),
            Err(e) => {
                warn!(card, device, subdevice_count, error = %e, "nativeOpen failed");
                None
            }
        }
    }
}

/// Native methods of `com.android.server.fingerprint.FingerprintService`.
pub struct FingerprintNatives {
    bridge: FingerprintBridge,
    looper: LooperHandle,
}

impl FingerprintNatives {
    /// `nativeInit`: bind the listener and start its looper thread.
    pub fn init(
        config: FingerprintConfig,
        registry: Arc<ModuleRegistry>,
        listener: impl FingerprintListener + 'static,
    ) -> Result<Self> {
        let (bridge, looper) = FingerprintBridge::init(config, registry, listener)?;
        Ok(Self { bridge, looper })
    }

    pub fn bridge(&self) -> &FingerprintBridge {
        &self.bridge
    }

    /// Thread every listener call happens on.
    pub fn looper_thread(&self) -> ThreadId {
        self.looper.thread_id()
    }

    /// `nativeOpenHal()I`: a non-zero handle, or `0` on failure.
    pub fn open_hal(&self) -> i32 {
        match self.bridge.open_hal() {
            Ok(opened) => {
                if let Some(mismatch) = opened.version_mismatch {
                    debug!(?mismatch, "HAL opened despite version mismatch");
                }
                i32::try_from(opened.handle.get()).unwrap_or(i32::MAX)
            }
            Err(_) => NO_HAL,
        }
    }

    /// `nativeCloseHal()I`.
    pub fn close_hal(&self) -> i32 {
        status::to_status(&self.bridge.close_hal())
    }

    // Ints cross into the HAL's unsigned parameters bit for bit.

    /// `nativeEnroll(II)I`.
    pub fn enroll(&self, timeout: i32, group_id: i32) -> i32 {
        status::to_status(&self.bridge.enroll(timeout as u32, group_id as u32))
    }

    /// `nativeEnrollCancel()I`.
    pub fn enroll_cancel(&self) -> i32 {
        status::to_status(&self.bridge.enroll_cancel())
    }

    /// `nativeRemove(II)I`.
    pub fn remove(&self, finger_id: i32, group_id: i32) -> i32 {
        status::to_status(&self.bridge.remove(finger_id as u32, group_id as u32))
    }

    /// `nativeAuthenticate(JI)I`.
    pub fn authenticate(&self, session_id: i64, group_id: i32) -> i32 {
        status::to_status(&self.bridge.authenticate(session_id as u64, group_id as u32))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use hwbridge_core::config::ClosePolicy;
    use hwbridge_fingerprint::sim::{HalCall, SimulatedDevice, SimulatedModule};

    use super::*;

    #[test]
    fn midi_count_sentinels() {
        let dir = tempfile::tempdir().unwrap();
        let natives = UsbMidiNatives::new(RawMidi::new(dir.path()));
        assert_eq!(natives.get_subdevice_count(0, 0), 0);

        std::fs::write(dir.path().join("controlC0"), b"").unwrap();
        assert_eq!(natives.get_subdevice_count(0, 0), -1);
        assert_eq!(natives.get_subdevice_count(-1, 0), -1);
    }

    #[test]
    fn midi_open_all_or_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let natives = UsbMidiNatives::new(RawMidi::new(dir.path()));
        assert!(natives.open(2, 0, 2).is_none());

        std::fs::write(dir.path().join("midiC2D0"), b"").unwrap();
        assert_eq!(natives.open(2, 0, 2).map(|fds| fds.len()), Some(2));
        assert!(natives.open(2, 0, -1).is_none());
        assert!(natives.open(3, 0, i32::MAX).is_none());
    }

    fn fingerprint(
        device: Arc<SimulatedDevice>,
        config: FingerprintConfig,
    ) -> (FingerprintNatives, Arc<Mutex<Vec<(i32, i32, i32, i32)>>>) {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(SimulatedModule::new("fingerprint", device)));
        let seen: Arc<Mutex<Vec<(i32, i32, i32, i32)>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let natives = FingerprintNatives::init(
            config,
            Arc::new(registry),
            move |t: i32, a: i32, b: i32, c: i32| sink.lock().unwrap().push((t, a, b, c)),
        )
        .unwrap();
        (natives, seen)
    }

    #[test]
    fn fingerprint_legacy_codes() {
        let device = Arc::new(SimulatedDevice::new().with_status("authenticate", -5));
        let (natives, _) = fingerprint(Arc::clone(&device), FingerprintConfig::default());

        assert_eq!(natives.enroll(60, 0), -libc::ENODEV);
        assert_eq!(natives.authenticate(1, 0), -libc::ENODEV);

        let handle = natives.open_hal();
        assert_ne!(handle, NO_HAL);
        assert_eq!(natives.open_hal(), handle);
        assert_eq!(natives.enroll(60, 0), 0);
        assert_eq!(natives.authenticate(1, 0), -5);
        assert_eq!(natives.close_hal(), -libc::ENOSYS);
    }

    #[test]
    fn fingerprint_open_failure_is_zero() {
        let (natives, _) = fingerprint(
            Arc::new(SimulatedDevice::new()),
            FingerprintConfig {
                module_id: "absent".into(),
                ..Default::default()
            },
        );
        assert_eq!(natives.open_hal(), NO_HAL);
    }

    #[test]
    fn fingerprint_release_close() {
        let device = Arc::new(SimulatedDevice::new());
        let (natives, _) = fingerprint(
            Arc::clone(&device),
            FingerprintConfig {
                close_policy: ClosePolicy::Release,
                ..Default::default()
            },
        );
        assert_ne!(natives.open_hal(), NO_HAL);
        assert_eq!(natives.close_hal(), 0);
        assert_eq!(natives.close_hal(), -libc::ENODEV);
        assert_eq!(device.calls().last(), Some(&HalCall::Close));
    }

    #[test]
    fn signed_args_reach_hal_unchanged() {
        let device = Arc::new(SimulatedDevice::new());
        let (natives, _) = fingerprint(Arc::clone(&device), FingerprintConfig::default());
        natives.open_hal();
        natives.remove(-1, 2);
        natives.authenticate(-2, 0);
        let calls = device.calls();
        assert!(calls.contains(&HalCall::Remove {
            finger: hwbridge_fingerprint::FingerId::new(u32::MAX, 2),
        }));
        assert!(calls.contains(&HalCall::Authenticate {
            operation_id: u64::MAX - 1,
            group_id: 0,
        }));
    }

    #[test]
    fn notifications_reach_listener() {
        let device = Arc::new(
            SimulatedDevice::new().with_enroll_samples(1, Duration::ZERO),
        );
        let (natives, seen) = fingerprint(Arc::clone(&device), FingerprintConfig::default());
        natives.open_hal();
        natives.enroll(60, 7);
        device.join_workers();

        let deadline = Instant::now() + Duration::from_secs(5);
        while seen.lock().unwrap().len() < 2 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(*seen.lock().unwrap(), vec![(1, 0, 0, 0), (3, 1, 7, 0)]);
    }
}
