//! Stable frame delivery point between capture and recognition sessions.
//!
//! The capture stream outlives any single recognition session, so frames are
//! pushed through a router whose sink can be swapped as sessions rotate. The
//! delivered counter doubles as the liveness signal the background heartbeat
//! reads to detect a stalled pipeline.

use super::AudioFrame;
use crate::lock_or_recover;
use crossbeam_channel::{Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct FrameRouter {
    sink: Mutex<Option<Sender<AudioFrame>>>,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl FrameRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the router at a new session's frame channel, replacing any
    /// previous sink.
    pub fn attach(&self, sink: Sender<AudioFrame>) {
        *lock_or_recover(&self.sink, "frame router sink") = Some(sink);
    }

    /// Drop the current sink. Frames keep arriving and keep counting toward
    /// liveness; they just have nowhere to go until the next attach.
    pub fn detach(&self) {
        *lock_or_recover(&self.sink, "frame router sink") = None;
    }

    /// Called from the audio callback thread. Counts the frame, then
    /// best-effort forwards it; a full channel sheds the frame rather than
    /// blocking the device callback.
    pub fn deliver(&self, frame: AudioFrame) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        let mut sink = lock_or_recover(&self.sink, "frame router sink");
        let Some(sender) = sink.as_ref() else {
            return;
        };
        match sender.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Disconnected(_)) => {
                // Session worker is gone; stop forwarding until re-attached.
                *sink = None;
            }
        }
    }

    /// Total frames seen since construction, whether or not a sink was
    /// attached. Monotonic; the heartbeat compares successive readings.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
