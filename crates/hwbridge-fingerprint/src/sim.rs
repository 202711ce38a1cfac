// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Simulated fingerprint HAL.
//
// Behaves like a vendor module closely enough to drive the bridge on a
// host: it records every call, answers with configurable statuses, and
// notifies from its own worker threads rather than from the caller's.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use hwbridge_core::config::FINGERPRINT_API_VERSION;

use crate::hal::{FingerId, FingerprintDevice, HalMessage, HalModule, HalOpenError, NotifyFn};

/// `FINGERPRINT_ACQUIRED_GOOD`.
pub const ACQUIRED_GOOD: u32 = 0;

/// One recorded device call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalCall {
    SetNotify { attached: bool },
    Enroll { group_id: u32, timeout_sec: u32 },
    EnrollCancel,
    Remove { finger: FingerId },
    Authenticate { operation_id: u64, group_id: u32 },
    Close,
}

/// A fake sensor.
pub struct SimulatedDevice {
    version: u32,
    enroll_samples: u32,
    sample_delay: Duration,
    statuses: HashMap<&'static str, i32>,
    notify: Mutex<Option<NotifyFn>>,
    calls: Mutex<Vec<HalCall>>,
    enrolled: Mutex<Vec<FingerId>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedDevice {
    pub fn new() -> Self {
        Self {
            version: FINGERPRINT_API_VERSION,
            enroll_samples: 0,
            sample_delay: Duration::ZERO,
            statuses: HashMap::new(),
            notify: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            enrolled: Mutex::new(Vec::new()),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Report `version` as the device API version.
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Make `operation` (`"set_notify"`, `"clear_notify"`, `"enroll"`,
    /// `"enroll_cancel"`, `"remove"`, `"authenticate"`, `"close"`) answer
    /// `status`. `"clear_notify"` is `set_notify(None)`.
    pub fn with_status(mut self, operation: &'static str, status: i32) -> Self {
        self.statuses.insert(operation, status);
        self
    }

    /// Have `enroll` play a touch sequence of `samples` acquisitions on a
    /// worker thread, `delay` apart.
    pub fn with_enroll_samples(mut self, samples: u32, delay: Duration) -> Self {
        self.enroll_samples = samples;
        self.sample_delay = delay;
        self
    }

    fn status(&self, operation: &str) -> i32 {
        self.statuses.get(operation).copied().unwrap_or(0)
    }

    fn record(&self, call: HalCall) {
        self.calls.lock().push(call);
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<HalCall> {
        self.calls.lock().clone()
    }

    pub fn has_notify(&self) -> bool {
        self.notify.lock().is_some()
    }

    pub fn enrolled(&self) -> Vec<FingerId> {
        self.enrolled.lock().clone()
    }

    /// Deliver `msg` through the installed callback on the calling thread.
    /// Returns `false` when no callback is installed.
    pub fn emit(&self, msg: HalMessage) -> bool {
        let notify = self.notify.lock().clone();
        match notify {
            Some(notify) => {
                notify(msg);
                true
            }
            None => false,
        }
    }

    /// Deliver `msgs` in order from a fresh worker thread.
    pub fn emit_from_worker(&self, msgs: Vec<HalMessage>, delay: Duration) {
        let notify = self.notify.lock().clone();
        let Some(notify) = notify else {
            return;
        };
        let worker = thread::spawn(move || {
            for msg in msgs {
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
                notify(msg);
            }
        });
        self.workers.lock().push(worker);
    }

    /// Wait for every worker thread started so far.
    pub fn join_workers(&self) {
        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        for worker in workers {
            let _ = worker.join();
        }
    }

    fn next_finger(&self, group_id: u32) -> FingerId {
        let enrolled = self.enrolled.lock();
        let fid = enrolled
            .iter()
            .filter(|f| f.gid == group_id)
            .map(|f| f.fid)
            .max()
            .map_or(1, |fid| fid + 1);
        FingerId::new(fid, group_id)
    }
}

impl FingerprintDevice for SimulatedDevice {
    fn version(&self) -> u32 {
        self.version
    }

    fn set_notify(&self, notify: Option<NotifyFn>) -> i32 {
        self.record(HalCall::SetNotify {
            attached: notify.is_some(),
        });
        let status = match notify {
            Some(_) => self.status("set_notify"),
            None => self.status("clear_notify"),
        };
        if status == 0 {
            *self.notify.lock() = notify;
        }
        status
    }

    fn enroll(&self, group_id: u32, timeout_sec: u32) -> i32 {
        self.record(HalCall::Enroll {
            group_id,
            timeout_sec,
        });
        let status = self.status("enroll");
        if status != 0 || self.enroll_samples == 0 {
            return status;
        }

        let finger = self.next_finger(group_id);
        self.enrolled.lock().push(finger);
        let mut msgs = Vec::new();
        for remaining in (0..self.enroll_samples).rev() {
            msgs.push(HalMessage::Acquired {
                acquired_info: ACQUIRED_GOOD,
            });
            msgs.push(HalMessage::TemplateEnrolling {
                finger,
                samples_remaining: remaining,
            });
        }
        debug!(?finger, samples = self.enroll_samples, "simulated enrollment");
        self.emit_from_worker(msgs, self.sample_delay);
        status
    }

    fn enroll_cancel(&self) -> i32 {
        self.record(HalCall::EnrollCancel);
        self.status("enroll_cancel")
    }

    fn remove(&self, finger: FingerId) -> i32 {
        self.record(HalCall::Remove { finger });
        let status = self.status("remove");
        if status == 0 {
            self.enrolled.lock().retain(|f| *f != finger);
            self.emit_from_worker(vec![HalMessage::TemplateRemoved { finger }], Duration::ZERO);
        }
        status
    }

    fn authenticate(&self, operation_id: u64, group_id: u32) -> i32 {
        self.record(HalCall::Authenticate {
            operation_id,
            group_id,
        });
        let status = self.status("authenticate");
        if status == 0 {
            // fid 0 means "no match" to the service.
            let matched = self
                .enrolled
                .lock()
                .iter()
                .copied()
                .find(|f| f.gid == group_id)
                .unwrap_or(FingerId::new(0, group_id));
            self.emit_from_worker(
                vec![
                    HalMessage::Acquired {
                        acquired_info: ACQUIRED_GOOD,
                    },
                    HalMessage::Processed { finger: matched },
                ],
                self.sample_delay,
            );
        }
        status
    }

    fn close(&self) -> i32 {
        self.record(HalCall::Close);
        self.join_workers();
        *self.notify.lock() = None;
        self.status("close")
    }
}

/// How the simulated module answers `open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenBehaviour {
    Open,
    NoOpenMethod,
    Fail(i32),
}

/// Module wrapper handing out one shared [`SimulatedDevice`].
pub struct SimulatedModule {
    id: String,
    device: Arc<SimulatedDevice>,
    open: OpenBehaviour,
}

impl SimulatedModule {
    pub fn new(id: impl Into<String>, device: Arc<SimulatedDevice>) -> Self {
        Self {
            id: id.into(),
            device,
            open: OpenBehaviour::Open,
        }
    }

    /// A module that exports no open method.
    pub fn without_open(mut self) -> Self {
        self.open = OpenBehaviour::NoOpenMethod;
        self
    }

    /// A module whose open answers `status`.
    pub fn failing_open(mut self, status: i32) -> Self {
        self.open = OpenBehaviour::Fail(status);
        self
    }

    pub fn device(&self) -> &Arc<SimulatedDevice> {
        &self.device
    }
}

impl HalModule for SimulatedModule {
    fn id(&self) -> &str {
        &self.id
    }

    fn open(&self) -> Result<Arc<dyn FingerprintDevice>, HalOpenError> {
        match self.open {
            OpenBehaviour::Open => Ok(self.device.clone()),
            OpenBehaviour::NoOpenMethod => Err(HalOpenError::NoOpenMethod),
            OpenBehaviour::Fail(status) => Err(HalOpenError::Failed(status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enroll_plays_countdown_from_worker() {
        let device = SimulatedDevice::new().with_enroll_samples(3, Duration::ZERO);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let caller = thread::current().id();
        device.set_notify(Some(Arc::new(move |msg: HalMessage| {
            assert_ne!(thread::current().id(), caller);
            sink.lock().push(msg);
        })));

        assert_eq!(device.enroll(5, 60), 0);
        device.join_workers();

        let remaining: Vec<u32> = seen
            .lock()
            .iter()
            .filter_map(|m| match m {
                HalMessage::TemplateEnrolling {
                    samples_remaining, ..
                } => Some(*samples_remaining),
                _ => None,
            })
            .collect();
        assert_eq!(remaining, vec![2, 1, 0]);
        assert_eq!(device.enrolled(), vec![FingerId::new(1, 5)]);
    }

    #[test]
    fn configured_status_is_returned_and_recorded() {
        let device = SimulatedDevice::new().with_status("remove", -2);
        let finger = FingerId::new(1, 0);
        assert_eq!(device.remove(finger), -2);
        assert_eq!(device.calls(), vec![HalCall::Remove { finger }]);
    }

    #[test]
    fn failed_set_notify_keeps_no_callback() {
        let device = SimulatedDevice::new().with_status("set_notify", -22);
        assert_eq!(device.set_notify(Some(Arc::new(|_: HalMessage| {}))), -22);
        assert!(!device.has_notify());
        assert!(!device.emit(HalMessage::Error { error: 1 }));
    }
}
