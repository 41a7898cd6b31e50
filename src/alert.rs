//! Per-target alert state.
//!
//! One [`AlertRecord`] exists per station with an in-progress alert. Records
//! are created by `raise`, removed by explicit dismissal, and expired by an
//! engine timer 60 seconds after activation. Repeated raises for the same
//! station are no-ops; at-most-once dispatch per target is enforced here.

use crate::notify::AlertDispatcher;
use crate::station::{Station, StationId};
use std::time::Instant;
use tracing::info;

#[derive(Debug)]
pub struct AlertRecord {
    pub station: Station,
    pub raised_at: Instant,
    generation: u64,
}

#[derive(Debug, Default)]
pub struct AlertCoordinator {
    records: Vec<AlertRecord>,
    next_generation: u64,
}

impl AlertCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record and dispatch the arrival notification. Returns the
    /// record's generation so the caller can arm the auto-dismiss timer, or
    /// `None` when the station already has an active alert.
    pub fn raise(&mut self, station: Station, dispatcher: &dyn AlertDispatcher) -> Option<u64> {
        if self.records.iter().any(|r| r.station.id == station.id) {
            return None;
        }
        self.next_generation += 1;
        let generation = self.next_generation;
        info!(station = %station.id, "raising arrival alert");
        dispatcher.notify_arrival(&station.name);
        self.records.push(AlertRecord {
            station,
            raised_at: Instant::now(),
            generation,
        });
        Some(generation)
    }

    /// Explicit dismissal; returns true when a record was removed.
    pub fn dismiss(&mut self, id: &StationId) -> bool {
        let before = self.records.len();
        self.records.retain(|r| &r.station.id != id);
        before != self.records.len()
    }

    /// Timer-driven expiry. The generation guards against a stale timer
    /// expiring a newer alert raised for the same station.
    pub fn expire(&mut self, id: &StationId, generation: u64) -> bool {
        let before = self.records.len();
        self.records
            .retain(|r| !(&r.station.id == id && r.generation == generation));
        before != self.records.len()
    }

    pub fn has_active(&self) -> bool {
        !self.records.is_empty()
    }

    pub fn active_names(&self) -> Vec<String> {
        self.records.iter().map(|r| r.station.name.clone()).collect()
    }

    /// Engine-level stop: drop everything.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}
