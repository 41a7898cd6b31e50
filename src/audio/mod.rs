//! Continuous microphone capture.
//!
//! Audio is captured via CPAL, downmixed to mono, resampled to 16kHz (the
//! recognizer's expected format), cut into fixed-size frames, and handed to a
//! [`FrameRouter`]. The router is the stable delivery point: capture runs for
//! the whole monitoring lifetime while recognition sessions come and go
//! underneath it.

/// Sample rate every frame is normalized to before recognition.
pub const TARGET_RATE: u32 = 16_000;

/// One mono PCM frame at [`TARGET_RATE`].
pub type AudioFrame = Vec<f32>;

mod capture;
mod dispatch;
mod level;
mod resample;
mod router;

pub use capture::{list_input_devices, AudioCapture, CaptureError, CpalCapture};
pub use level::rms_db;
pub use router::FrameRouter;
