//! Transcript-to-target matching.
//!
//! An announcement matches a target when an arrival keyword and one of the
//! target's names appear in the same transcript, or when the transcript is
//! nothing but the name (recognizers often clip the keyword at a session
//! boundary, leaving the bare station name as the whole utterance).

use crate::station::Station;

/// Arrival phrases in the operating language plus common transliterations.
pub const ARRIVAL_KEYWORDS: &[&str] = &[
    "下一站",
    "现在到达",
    "到达",
    "即将",
    "站名",
    "next station",
    "arriving at",
];

#[derive(Debug, Clone)]
pub struct MatchDetector {
    keywords: Vec<String>,
}

impl MatchDetector {
    /// Detector with the built-in keyword list plus any extra phrases.
    pub fn new(extra_keywords: &[String]) -> Self {
        let mut keywords: Vec<String> = ARRIVAL_KEYWORDS
            .iter()
            .map(|kw| kw.to_lowercase())
            .collect();
        keywords.extend(
            extra_keywords
                .iter()
                .map(|kw| kw.to_lowercase())
                .filter(|kw| !kw.trim().is_empty()),
        );
        Self { keywords }
    }

    /// Evaluate one transcript against the target set and claim at most one
    /// match. The matched station is removed from `targets` in the same step,
    /// so there is no window where a reported match is still monitored.
    ///
    /// When several targets satisfy the predicate the first in iteration
    /// order wins; simultaneous announcements for two monitored stations are
    /// rare enough that this deterministic approximation is acceptable.
    pub fn claim_match(&self, transcript: &str, targets: &mut Vec<Station>) -> Option<Station> {
        let text = transcript.to_lowercase();
        let trimmed = text.trim();
        if trimmed.is_empty() || targets.is_empty() {
            return None;
        }
        let keyword_present = self.keywords.iter().any(|kw| text.contains(kw.as_str()));

        let index = targets.iter().position(|station| {
            let name = station.name.to_lowercase();
            let name_alt = station.name_alt.to_lowercase();
            let name_contained = text.contains(&name) || text.contains(&name_alt);
            let exact = trimmed == name || trimmed == name_alt;
            (keyword_present && name_contained) || exact
        })?;
        Some(targets.remove(index))
    }

    /// A target whose name appears without a keyword and without an exact
    /// match. Not a match; used only for a "name heard, awaiting keyword"
    /// status update.
    pub fn name_sighted<'a>(&self, transcript: &str, targets: &'a [Station]) -> Option<&'a Station> {
        let text = transcript.to_lowercase();
        targets.iter().find(|station| {
            text.contains(&station.name.to_lowercase())
                || text.contains(&station.name_alt.to_lowercase())
        })
    }
}

impl Default for MatchDetector {
    fn default() -> Self {
        Self::new(&[])
    }
}
