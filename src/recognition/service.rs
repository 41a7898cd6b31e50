use crate::audio::AudioFrame;
use anyhow::Result;
use crossbeam_channel::Receiver;

/// Failure code a service emits when a session saw nothing but silence.
/// Rotation on this code is immediate; silence is routine, not an error the
/// user can act on.
pub const CODE_NO_SPEECH: i32 = 203;

/// Failure code for over-quota / too-frequent session starts. Rotation backs
/// off for a cooldown first; immediate retry turns this into an
/// unrecoverable failure loop.
pub const CODE_TOO_FREQUENT: i32 = 1110;

/// Failure code for an internal decode error. Treated as the generic error
/// class: rotate after a short fixed delay.
pub const CODE_DECODE_FAILED: i32 = 301;

/// Parameters for one recognition session.
pub struct SessionRequest {
    pub locale: String,
    /// Prefer on-device recognition when the service supports both; on-device
    /// keeps working without a network and is the stabler path.
    pub prefer_on_device: bool,
    /// Audio frames for this session. Dropping the sending side ends the
    /// session with `Completed`.
    pub frames: Receiver<AudioFrame>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Transcript { text: String, is_final: bool },
    Ended(SessionEnd),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Completed,
    /// Opaque service-specific code; the scheduler classifies it by value.
    Failed(i32),
}

/// Black-box streaming speech-to-text service.
///
/// Each opened session is single-use: after the terminal [`SessionEvent::Ended`]
/// the frame channel is dead and callers must open a new session. Platform
/// services enforce a narrow per-session lifetime (observed ~30-50s), so the
/// scheduler rotates sessions pre-emptively rather than reacting to forced
/// termination.
pub trait SpeechService: Send + Sync {
    fn open_session(&self, request: SessionRequest) -> Result<Receiver<SessionEvent>>;
}
