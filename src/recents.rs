//! Recent-target record list.
//!
//! Serialization format shared with the presentation layer: an ordered
//! sequence of stations, most-recent-first, capped at [`RecentStations::CAP`]
//! entries. The engine itself never touches this; it is persisted and
//! consumed by whatever UI sits on top.

use crate::station::Station;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecentStations {
    entries: Vec<Station>,
}

impl RecentStations {
    /// Maximum retained entries; older entries fall off the end.
    pub const CAP: usize = 15;

    pub fn entries(&self) -> &[Station] {
        &self.entries
    }

    /// Record a selection. An existing entry for the same station moves to
    /// the front instead of duplicating.
    pub fn push(&mut self, station: Station) {
        self.entries.retain(|existing| existing.id != station.id);
        self.entries.insert(0, station);
        self.entries.truncate(Self::CAP);
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("failed to serialize recent stations")
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("failed to parse recent stations")
    }
}
