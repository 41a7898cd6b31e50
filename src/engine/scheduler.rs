//! Recognition scheduling policy: session phases and error-specific backoff.
//!
//! The transitions themselves run on the engine thread; this module holds the
//! pure pieces so the policy is testable without spinning up an engine.

use crate::config::EngineConfig;
use crate::recognition::{SessionEnd, CODE_NO_SPEECH, CODE_TOO_FREQUENT};
use std::time::Duration;

/// Where the scheduler sits in a session's lifecycle. At most one session
/// exists at a time; `Starting` and `Rotating` are the two wait states that
/// give the platform room to release the previous device/service handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Stopped,
    /// Settle delay armed; a session opens when it fires.
    Starting,
    /// Session open, rotation ceiling timer armed.
    Active,
    /// Previous session torn down, backoff delay armed.
    Rotating,
}

/// Why a session is being replaced. Diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateReason {
    Ceiling,
    SessionEnded,
    Stalled,
    GrantExpiring,
}

impl RotateReason {
    pub fn label(self) -> &'static str {
        match self {
            RotateReason::Ceiling => "ceiling",
            RotateReason::SessionEnded => "session_ended",
            RotateReason::Stalled => "stalled",
            RotateReason::GrantExpiring => "grant_expiring",
        }
    }
}

/// Failure classes the scheduler distinguishes. Codes are opaque integers
/// from the service; everything unknown lands in `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Silence,
    Quota,
    Other,
}

pub fn classify(code: i32) -> ErrorClass {
    match code {
        CODE_NO_SPEECH => ErrorClass::Silence,
        CODE_TOO_FREQUENT => ErrorClass::Quota,
        _ => ErrorClass::Other,
    }
}

/// Delay before the next session after a terminal event.
///
/// Silence rotates immediately: announcements can be fast, and a gap here is
/// a missed arrival. Quota errors must cool down first; immediate retry on
/// those produces an unrecoverable failure loop. Everything else, including
/// normal completion, takes the short fixed delay.
pub fn rotation_backoff(end: SessionEnd, cfg: &EngineConfig) -> Duration {
    match end {
        SessionEnd::Completed => Duration::from_millis(cfg.rotation_delay_ms),
        SessionEnd::Failed(code) => match classify(code) {
            ErrorClass::Silence => Duration::ZERO,
            ErrorClass::Quota => Duration::from_millis(cfg.quota_cooldown_ms),
            ErrorClass::Other => Duration::from_millis(cfg.rotation_delay_ms),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::CODE_DECODE_FAILED;

    fn cfg() -> EngineConfig {
        EngineConfig {
            rotation_delay_ms: 1_000,
            quota_cooldown_ms: 3_000,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn known_codes_classify_into_their_classes() {
        assert_eq!(classify(CODE_NO_SPEECH), ErrorClass::Silence);
        assert_eq!(classify(CODE_TOO_FREQUENT), ErrorClass::Quota);
        assert_eq!(classify(CODE_DECODE_FAILED), ErrorClass::Other);
        assert_eq!(classify(-1), ErrorClass::Other);
    }

    #[test]
    fn silence_rotates_immediately() {
        let delay = rotation_backoff(SessionEnd::Failed(CODE_NO_SPEECH), &cfg());
        assert_eq!(delay, Duration::ZERO);
    }

    #[test]
    fn quota_rotates_after_cooldown() {
        let delay = rotation_backoff(SessionEnd::Failed(CODE_TOO_FREQUENT), &cfg());
        assert_eq!(delay, Duration::from_millis(3_000));
    }

    #[test]
    fn other_errors_and_completion_use_the_fixed_delay() {
        let delay = rotation_backoff(SessionEnd::Failed(999), &cfg());
        assert_eq!(delay, Duration::from_millis(1_000));
        let delay = rotation_backoff(SessionEnd::Completed, &cfg());
        assert_eq!(delay, Duration::from_millis(1_000));
    }
}
