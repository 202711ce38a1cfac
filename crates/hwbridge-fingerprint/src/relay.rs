// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Notification relay.
//
// The HAL calls its notify callback on threads it owns. The listener on
// the other side may only be called from one designated thread, so the
// callback never calls it directly: it packages the message as a
// `FingerprintEvent` and pushes it into a channel. The `Looper` owns the
// receiving end and is the only thing that ever calls the listener.
//
// Ordering is the channel's: events are delivered exactly once, in the
// order they were enqueued, regardless of which thread enqueued them.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use tokio::sync::mpsc;
use tracing::{debug, error, trace, warn};

use crate::event::FingerprintEvent;
use crate::hal::{HalMessage, NotifyFn};

/// Receiver of relayed notifications; called on the looper thread only.
pub trait FingerprintListener: Send {
    fn notify(&mut self, msg_type: i32, arg1: i32, arg2: i32, arg3: i32);
}

impl<F> FingerprintListener for F
where
    F: FnMut(i32, i32, i32, i32) + Send,
{
    fn notify(&mut self, msg_type: i32, arg1: i32, arg2: i32, arg3: i32) {
        self(msg_type, arg1, arg2, arg3)
    }
}

/// Producer side of the relay. Cheap to clone; safe to use from any thread.
#[derive(Debug, Clone)]
pub struct EventRelay {
    tx: mpsc::UnboundedSender<FingerprintEvent>,
}

/// Consumer side of the relay.
pub struct Looper {
    rx: mpsc::UnboundedReceiver<FingerprintEvent>,
    listener: Box<dyn FingerprintListener>,
}

/// Create a connected relay and looper delivering to `listener`.
pub fn channel(listener: impl FingerprintListener + 'static) -> (EventRelay, Looper) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        EventRelay { tx },
        Looper {
            rx,
            listener: Box::new(listener),
        },
    )
}

impl EventRelay {
    /// Package and enqueue a HAL message.
    ///
    /// Returns `false` when the message was dropped: either its type is not
    /// one the relay forwards, or the looper has gone away.
    pub fn post(&self, msg: HalMessage) -> bool {
        let Some(event) = FingerprintEvent::from_hal(&msg) else {
            error!(msg_type = msg.msg_type(), "fingerprint: invalid msg");
            return false;
        };
        self.enqueue(event)
    }

    /// Enqueue an already packaged event.
    pub fn enqueue(&self, event: FingerprintEvent) -> bool {
        trace!(?event, "enqueue");
        if self.tx.send(event).is_err() {
            warn!(?event, "looper stopped, dropping fingerprint event");
            return false;
        }
        true
    }

    /// The callback handed to the HAL's `set_notify`.
    pub fn notifier(&self) -> NotifyFn {
        let relay = self.clone();
        Arc::new(move |msg: HalMessage| {
            relay.post(msg);
        })
    }

    /// `true` once the looper has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl Looper {
    fn dispatch(&mut self, event: FingerprintEvent) {
        let (msg_type, arg1, arg2, arg3) = event.notify_args();
        trace!(msg_type, arg1, arg2, arg3, "dispatch");
        self.listener.notify(msg_type, arg1, arg2, arg3);
    }

    /// Deliver everything already queued, without blocking.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.dispatch(event);
            delivered += 1;
        }
        delivered
    }

    /// Deliver events on the current thread until every producer is gone.
    ///
    /// Must not be called from inside an async runtime; use
    /// [`Looper::run_async`] there.
    pub fn run(mut self) {
        while let Some(event) = self.rx.blocking_recv() {
            self.dispatch(event);
        }
        debug!("relay closed, looper exiting");
    }

    /// Async counterpart of [`Looper::run`].
    pub async fn run_async(mut self) {
        while let Some(event) = self.rx.recv().await {
            self.dispatch(event);
        }
        debug!("relay closed, looper exiting");
    }

    /// Run the looper on a dedicated, named thread.
    pub fn spawn(self, name: &str) -> io::Result<LooperHandle> {
        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || self.run())?;
        debug!(thread = name, "looper started");
        Ok(LooperHandle { thread })
    }
}

/// Handle to a looper running on its own thread.
#[derive(Debug)]
pub struct LooperHandle {
    thread: JoinHandle<()>,
}

impl LooperHandle {
    /// Id of the thread every notification is delivered on.
    pub fn thread_id(&self) -> ThreadId {
        self.thread.thread().id()
    }

    /// Wait for the looper to drain and exit. It exits once every
    /// [`EventRelay`] clone (including those held by HAL callbacks) is gone.
    pub fn join(self) -> thread::Result<()> {
        self.thread.join()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::event::EventKind;
    use crate::hal::FingerId;

    type Seen = Arc<Mutex<Vec<((i32, i32, i32, i32), ThreadId)>>>;

    fn recording() -> (Seen, impl FingerprintListener + 'static) {
        let seen: Seen = Arc::default();
        let sink = Arc::clone(&seen);
        let listener = move |t: i32, a: i32, b: i32, c: i32| {
            sink.lock()
                .unwrap()
                .push(((t, a, b, c), thread::current().id()));
        };
        (seen, listener)
    }

    fn enrolling(remaining: u32) -> HalMessage {
        HalMessage::TemplateEnrolling {
            finger: FingerId::new(1, 0),
            samples_remaining: remaining,
        }
    }

    #[test]
    fn events_from_foreign_threads_arrive_in_order_on_looper_thread() {
        let (seen, listener) = recording();
        let (relay, looper) = channel(listener);
        let handle = looper.spawn("test-looper").unwrap();
        let looper_thread = handle.thread_id();

        let first = relay.clone();
        thread::spawn(move || assert!(first.post(enrolling(2))))
            .join()
            .unwrap();
        let second = relay.clone();
        thread::spawn(move || assert!(second.post(enrolling(1))))
            .join()
            .unwrap();

        drop(relay);
        handle.join().unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, (3, 1, 0, 2));
        assert_eq!(seen[1].0, (3, 1, 0, 1));
        assert!(seen.iter().all(|(_, id)| *id == looper_thread));
    }

    #[test]
    fn per_producer_order_survives_concurrent_posting() {
        let (seen, listener) = recording();
        let (relay, looper) = channel(listener);
        let handle = looper.spawn("test-looper").unwrap();

        let producers: Vec<_> = (0..4u32)
            .map(|producer| {
                let relay = relay.clone();
                thread::spawn(move || {
                    for seq in 0..100 {
                        relay.post(HalMessage::Processed {
                            finger: FingerId::new(seq, producer),
                        });
                    }
                })
            })
            .collect();
        for p in producers {
            p.join().unwrap();
        }
        drop(relay);
        handle.join().unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 400);
        for producer in 0..4 {
            let seqs: Vec<i32> = seen
                .iter()
                .filter(|((_, _, gid, _), _)| *gid == producer)
                .map(|((_, fid, _, _), _)| *fid)
                .collect();
            assert_eq!(seqs, (0..100).collect::<Vec<_>>());
        }
    }

    #[test]
    fn unknown_kind_never_reaches_listener() {
        let (seen, listener) = recording();
        let (relay, mut looper) = channel(listener);

        assert!(!relay.post(HalMessage::Other { msg_type: 77 }));
        assert!(relay.post(HalMessage::Error { error: 1 }));
        assert_eq!(looper.dispatch_pending(), 1);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, (-1, 1, 0, 0));
    }

    #[test]
    fn nothing_is_delivered_before_the_looper_runs() {
        let (seen, listener) = recording();
        let (relay, mut looper) = channel(listener);

        relay.enqueue(FingerprintEvent::new(EventKind::Acquired, 0, 0, 0));
        relay.notifier()(HalMessage::TemplateRemoved {
            finger: FingerId::new(3, 1),
        });
        assert!(seen.lock().unwrap().is_empty());

        assert_eq!(looper.dispatch_pending(), 2);
        assert_eq!(looper.dispatch_pending(), 0);
        assert_eq!(seen.lock().unwrap()[1].0, (4, 3, 1, 0));
    }

    #[test]
    fn posting_after_looper_dropped_reports_failure() {
        let (_seen, listener) = recording();
        let (relay, looper) = channel(listener);
        drop(looper);
        assert!(relay.is_closed());
        assert!(!relay.post(HalMessage::Acquired { acquired_info: 0 }));
    }
}
