//! Alert delivery interface.
//!
//! The engine never talks to a notification system directly; it is handed an
//! [`AlertDispatcher`] at construction. Arrival notifications are
//! fire-and-forget, the debug channel is silent and diagnostic-only, and the
//! status surface keeps one glanceable entry per monitored target keyed by
//! station name.

use std::collections::HashSet;
use std::io::Write;
use std::sync::Mutex;
use tracing::debug;

pub trait AlertDispatcher: Send + Sync {
    /// Deliver the arrival alert for a station. Delivery/ack semantics are
    /// the dispatcher's concern.
    fn notify_arrival(&self, station_name: &str);

    /// Silent diagnostic channel, visible while backgrounded. Not part of
    /// the alerting contract.
    fn debug_notify(&self, text: &str);

    /// Begin a glanceable status entry for a station. Starting twice for the
    /// same name is a no-op.
    fn start_status(&self, station_name: &str);

    /// Update the status entry text for a station.
    fn update_status(&self, station_name: &str, text: &str);

    /// End the status entry for a station.
    fn stop_status(&self, station_name: &str);
}

/// Terminal dispatcher: arrival alerts go to stdout with a bell, diagnostics
/// to the trace log, status lines to stdout.
pub struct ConsoleDispatcher {
    bell: bool,
    active_statuses: Mutex<HashSet<String>>,
}

impl ConsoleDispatcher {
    pub fn new(bell: bool) -> Self {
        Self {
            bell,
            active_statuses: Mutex::new(HashSet::new()),
        }
    }
}

impl AlertDispatcher for ConsoleDispatcher {
    fn notify_arrival(&self, station_name: &str) {
        let mut stdout = std::io::stdout().lock();
        if self.bell {
            let _ = stdout.write_all(b"\x07");
        }
        let _ = writeln!(stdout, "🚇 arriving: {station_name}");
        let _ = stdout.flush();
    }

    fn debug_notify(&self, text: &str) {
        debug!(target: "stationwatch::notify", "{text}");
    }

    fn start_status(&self, station_name: &str) {
        let mut active = crate::lock_or_recover(&self.active_statuses, "console statuses");
        if !active.insert(station_name.to_string()) {
            return;
        }
        println!("⏳ watching: {station_name}");
    }

    fn update_status(&self, station_name: &str, text: &str) {
        let active = crate::lock_or_recover(&self.active_statuses, "console statuses");
        if active.contains(station_name) {
            println!("   {station_name}: {text}");
        }
    }

    fn stop_status(&self, station_name: &str) {
        let mut active = crate::lock_or_recover(&self.active_statuses, "console statuses");
        if active.remove(station_name) {
            println!("✔ done: {station_name}");
        }
    }
}
