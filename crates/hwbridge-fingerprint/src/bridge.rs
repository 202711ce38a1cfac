// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fingerprint HAL bridge.
//
// `FingerprintBridge` is the per-service context: it owns the open device
// (at most one per bridge) and the producer end of the notification relay.
// Device operations are synchronous pass-throughs; the HAL's status comes
// back unchanged inside `OperationFailed` when it is non-zero.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::RwLock;
use tracing::{debug, error, info, instrument, warn};

use hwbridge_core::config::{ClosePolicy, FingerprintConfig, VersionPolicy};
use hwbridge_core::error::{BridgeError, Result};

use crate::hal::{FingerId, FingerprintDevice, HalOpenError};
use crate::registry::ModuleRegistry;
use crate::relay::{self, EventRelay, FingerprintListener, LooperHandle};

/// Opaque, non-zero token for an open HAL device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HalHandle(NonZeroU32);

impl HalHandle {
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

/// The device reported a different API version than expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionMismatch {
    pub expected: u32,
    pub actual: u32,
}

/// Result of a successful `open_hal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenedHal {
    pub handle: HalHandle,
    /// Set when the device was kept despite an unexpected version.
    pub version_mismatch: Option<VersionMismatch>,
}

struct OpenDevice {
    opened: OpenedHal,
    device: Arc<dyn FingerprintDevice>,
}

pub struct FingerprintBridge {
    config: FingerprintConfig,
    registry: Arc<ModuleRegistry>,
    relay: EventRelay,
    device: RwLock<Option<OpenDevice>>,
    next_handle: AtomicU32,
}

impl FingerprintBridge {
    pub fn new(
        config: FingerprintConfig,
        registry: Arc<ModuleRegistry>,
        relay: EventRelay,
    ) -> Self {
        Self {
            config,
            registry,
            relay,
            device: RwLock::new(None),
            next_handle: AtomicU32::new(1),
        }
    }

    /// Bind a listener: start the looper thread that will deliver every
    /// notification to it, and build the bridge feeding that looper.
    #[instrument(skip_all, fields(module = %config.module_id))]
    pub fn init(
        config: FingerprintConfig,
        registry: Arc<ModuleRegistry>,
        listener: impl FingerprintListener + 'static,
    ) -> Result<(Self, LooperHandle)> {
        let (relay, looper) = relay::channel(listener);
        let looper = looper.spawn(&config.looper_thread)?;
        debug!("fingerprint bridge initialised");
        Ok((Self::new(config, registry, relay), looper))
    }

    pub fn config(&self) -> &FingerprintConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.device.read().is_some()
    }

    /// Load the module, open its device and attach the notify callback.
    ///
    /// Opening an already open bridge returns the existing handle.
    #[instrument(skip(self), fields(module = %self.config.module_id))]
    pub fn open_hal(&self) -> Result<OpenedHal> {
        let mut slot = self.device.write();
        if let Some(open) = slot.as_ref() {
            debug!(handle = open.opened.handle.get(), "fingerprint HAL already open");
            return Ok(open.opened);
        }

        let module = self.registry.get(&self.config.module_id).inspect_err(|e| {
            error!(error = %e, "can't open fingerprint HW module");
        })?;

        let device = module.open().map_err(|e| {
            error!(error = %e, "can't open fingerprint device");
            match e {
                HalOpenError::NoOpenMethod => {
                    BridgeError::ResourceUnavailable(format!("module {:?}: {e}", module.id()))
                }
                HalOpenError::Failed(status) => BridgeError::failed("open", status),
            }
        })?;

        let expected = self.config.expected_version;
        let actual = device.version();
        let mut version_mismatch = None;
        if actual != expected {
            match self.config.version_policy {
                VersionPolicy::Warn => {
                    warn!(expected, actual, "wrong fingerprint HAL version, continuing");
                    version_mismatch = Some(VersionMismatch { expected, actual });
                }
                VersionPolicy::Reject => {
                    error!(expected, actual, "wrong fingerprint HAL version");
                    device.close();
                    return Err(BridgeError::VersionMismatch { expected, actual });
                }
            }
        }

        let status = device.set_notify(Some(self.relay.notifier()));
        if status < 0 {
            error!(status, "set_notify failed");
            device.close();
            return Err(BridgeError::failed("set_notify", status));
        }

        let raw = self.next_handle.fetch_add(1, Ordering::Relaxed);
        let handle = HalHandle(NonZeroU32::new(raw).unwrap_or(NonZeroU32::MIN));
        let opened = OpenedHal {
            handle,
            version_mismatch,
        };
        *slot = Some(OpenDevice {
            opened,
            device,
        });
        info!(handle = handle.get(), version = actual, "fingerprint HAL initialised");
        Ok(opened)
    }

    /// Tear down the device according to the configured close policy.
    #[instrument(skip(self))]
    pub fn close_hal(&self) -> Result<()> {
        match self.config.close_policy {
            ClosePolicy::Unsupported => {
                debug!("close_hal not supported by policy");
                Err(BridgeError::Unsupported)
            }
            ClosePolicy::Release => {
                let open = self
                    .device
                    .write()
                    .take()
                    .ok_or(BridgeError::NotInitialized("fingerprint HAL"))?;
                let detach = open.device.set_notify(None);
                if detach != 0 {
                    warn!(status = detach, "set_notify(None) failed, closing anyway");
                }
                let status = open.device.close();
                if status != 0 {
                    warn!(status, "fingerprint device close failed");
                    return Err(BridgeError::failed("close", status));
                }
                info!(handle = open.opened.handle.get(), "fingerprint HAL closed");
                Ok(())
            }
        }
    }

    fn device(&self) -> Result<Arc<dyn FingerprintDevice>> {
        self.device
            .read()
            .as_ref()
            .map(|open| Arc::clone(&open.device))
            .ok_or(BridgeError::NotInitialized("fingerprint HAL"))
    }

    pub fn enroll(&self, timeout_sec: u32, group_id: u32) -> Result<()> {
        debug!(group_id, timeout_sec, "enroll");
        let device = self.device()?;
        check("enroll", device.enroll(group_id, timeout_sec))
    }

    pub fn enroll_cancel(&self) -> Result<()> {
        debug!("enroll_cancel");
        let device = self.device()?;
        check("enroll_cancel", device.enroll_cancel())
    }

    pub fn remove(&self, finger_id: u32, group_id: u32) -> Result<()> {
        debug!(finger_id, group_id, "remove");
        let device = self.device()?;
        check("remove", device.remove(FingerId::new(finger_id, group_id)))
    }

    pub fn authenticate(&self, session_id: u64, group_id: u32) -> Result<()> {
        debug!(session_id, group_id, "authenticate");
        let device = self.device()?;
        check("authenticate", device.authenticate(session_id, group_id))
    }
}

fn check(operation: &'static str, status: i32) -> Result<()> {
    if status == 0 {
        Ok(())
    } else {
        Err(BridgeError::failed(operation, status))
    }
}
