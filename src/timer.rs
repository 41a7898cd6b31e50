//! Timers as messages.
//!
//! Nothing in the engine fires a callback into shared state; every timer is a
//! thread that sleeps and then sends an event into the coordination channel.
//! One-shot timers are never cancelled directly — the engine drops stale
//! events by epoch instead, which avoids every cancel/fire race.

use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Fire `event` into `tx` after `delay`. Send failures are ignored: a closed
/// channel just means the engine is gone.
pub(crate) fn schedule<E: Send + 'static>(delay: Duration, tx: Sender<E>, event: E) {
    thread::spawn(move || {
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        let _ = tx.send(event);
    });
}

/// Fixed-interval ticker. Cancelling stops the thread at the next tick
/// boundary; pending ticks already in the channel are dropped by the
/// receiver's own staleness checks.
pub(crate) struct RepeatingTimer {
    stop: Arc<AtomicBool>,
}

impl RepeatingTimer {
    pub(crate) fn spawn<E, F>(interval: Duration, tx: Sender<E>, make_event: F) -> Self
    where
        E: Send + 'static,
        F: Fn() -> E + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        thread::spawn(move || loop {
            thread::sleep(interval);
            if stop_flag.load(Ordering::Relaxed) {
                break;
            }
            if tx.send(make_event()).is_err() {
                break;
            }
        });
        Self { stop }
    }

    pub(crate) fn cancel(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

impl Drop for RepeatingTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
