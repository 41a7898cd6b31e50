//! Streaming speech recognition behind a service boundary.
//!
//! The engine treats transcription as a black box: it hands a
//! [`SpeechService`] a locale, an on-device preference, and a stream of audio
//! frames, and gets back partial transcripts terminated by a completion or a
//! coded failure. [`WhisperService`] is the bundled on-device implementation.

mod service;
mod session;
#[cfg(test)]
mod tests;
mod text;
mod whisper;

pub use service::{
    SessionEnd, SessionEvent, SessionRequest, SpeechService, CODE_DECODE_FAILED, CODE_NO_SPEECH,
    CODE_TOO_FREQUENT,
};
pub use session::{RecognitionSession, SessionSpec};
pub use text::sanitize_transcript;
pub use whisper::WhisperService;
