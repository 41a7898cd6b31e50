//! Station identity and naming.
//!
//! A station is identified by an opaque id; the name fields exist solely for
//! textual matching against transcripts and for display.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque station identity. Two stations are the same station iff their ids
/// are equal; names play no part in identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StationId(pub String);

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One monitorable location.
///
/// `name` is the primary (announcement-language) name, `name_alt` the
/// transliterated/secondary name. Announcements may use either, so both feed
/// the match detector. `line` and `city` are grouping labels for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub id: StationId,
    pub name: String,
    pub name_alt: String,
    pub line: String,
    pub city: String,
}

impl Station {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        name_alt: impl Into<String>,
        line: impl Into<String>,
        city: impl Into<String>,
    ) -> Self {
        Self {
            id: StationId(id.into()),
            name: name.into(),
            name_alt: name_alt.into(),
            line: line.into(),
            city: city.into(),
        }
    }
}

impl PartialEq for Station {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Station {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_by_id_only() {
        let a = Station::new("s1", "国贸", "Guomao", "1号线", "北京");
        let b = Station::new("s1", "different", "names", "2号线", "上海");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_ids_are_not_equal() {
        let a = Station::new("s1", "国贸", "Guomao", "1号线", "北京");
        let b = Station::new("s2", "国贸", "Guomao", "1号线", "北京");
        assert_ne!(a, b);
    }
}
