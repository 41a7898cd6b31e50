//! On-device recognition backed by whisper.cpp.
//!
//! The model context is loaded once and shared across sessions. Each session
//! gets a worker thread that accumulates a rolling audio window and
//! re-decodes it at a fixed cadence, emitting a partial transcript whenever
//! the text changes. Whisper itself is batch-oriented; the rolling window is
//! what turns it into the streaming service the engine expects.

use super::service::{
    SessionEnd, SessionEvent, SessionRequest, SpeechService, CODE_DECODE_FAILED, CODE_NO_SPEECH,
};
use super::text::sanitize_transcript;
use crate::audio::{rms_db, TARGET_RATE};
use crate::config::RecognizerConfig;
use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// How long the worker waits for a frame before re-checking timers.
const FRAME_WAIT: Duration = Duration::from_millis(100);

pub struct WhisperService {
    ctx: Arc<WhisperContext>,
    cfg: RecognizerConfig,
}

impl WhisperService {
    /// Load the whisper model from disk. whisper.cpp chats on stderr during
    /// initialization, so loading happens with stderr parked on /dev/null.
    pub fn new(cfg: RecognizerConfig) -> Result<Self> {
        install_log_silencer();
        let ctx = with_stderr_silenced(|| {
            WhisperContext::new_with_params(&cfg.model_path, WhisperContextParameters::default())
        })
        .context("failed to load whisper model")?;
        Ok(Self {
            ctx: Arc::new(ctx),
            cfg,
        })
    }
}

impl SpeechService for WhisperService {
    fn open_session(&self, request: SessionRequest) -> Result<Receiver<SessionEvent>> {
        if !request.prefer_on_device {
            // No networked backend is bundled; recognition stays on-device.
            debug!("networked recognition requested; serving on-device instead");
        }
        let (events_tx, events_rx) = unbounded();
        let worker = SessionWorker {
            ctx: self.ctx.clone(),
            cfg: self.cfg.clone(),
            lang: session_language(&request.locale, &self.cfg.lang),
            frames: request.frames,
            events: events_tx,
        };
        thread::spawn(move || worker.run());
        Ok(events_rx)
    }
}

/// Reduce a locale like `zh-CN` to the primary subtag whisper understands.
fn session_language(locale: &str, fallback: &str) -> String {
    let primary = locale
        .split(['-', '_'])
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    if primary.is_empty() {
        fallback.to_string()
    } else {
        primary
    }
}

struct SessionWorker {
    ctx: Arc<WhisperContext>,
    cfg: RecognizerConfig,
    lang: String,
    frames: Receiver<crate::audio::AudioFrame>,
    events: Sender<SessionEvent>,
}

impl SessionWorker {
    fn run(self) {
        let window_samples =
            ((self.cfg.decode_window_ms * u64::from(TARGET_RATE)) / 1000).max(1) as usize;
        let min_decode_samples =
            ((self.cfg.min_decode_ms * u64::from(TARGET_RATE)) / 1000).max(1) as usize;

        let mut window: Vec<f32> = Vec::with_capacity(window_samples);
        let mut last_text = String::new();
        let mut last_decode = Instant::now();
        let mut speech_seen = false;
        let mut trailing_silence_ms = 0u64;

        loop {
            match self.frames.recv_timeout(FRAME_WAIT) {
                Ok(frame) => {
                    let frame_ms = (frame.len() as u64 * 1000) / u64::from(TARGET_RATE);
                    if rms_db(&frame) >= self.cfg.silence_threshold_db {
                        speech_seen = true;
                        trailing_silence_ms = 0;
                    } else {
                        trailing_silence_ms = trailing_silence_ms.saturating_add(frame_ms);
                    }
                    window.extend_from_slice(&frame);
                    if window.len() > window_samples {
                        let excess = window.len() - window_samples;
                        window.drain(..excess);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    // No frames is a pipeline concern, not silence; the
                    // engine's heartbeat owns stall detection.
                }
                Err(RecvTimeoutError::Disconnected) => {
                    if !last_text.is_empty() {
                        let _ = self.events.send(SessionEvent::Transcript {
                            text: last_text,
                            is_final: true,
                        });
                    }
                    let _ = self.events.send(SessionEvent::Ended(SessionEnd::Completed));
                    return;
                }
            }

            // A long silent tail ends the session the way the platform
            // recognizer would: with a no-speech failure the scheduler
            // recovers from immediately.
            if trailing_silence_ms >= self.cfg.silence_window_ms {
                let _ = self
                    .events
                    .send(SessionEvent::Ended(SessionEnd::Failed(CODE_NO_SPEECH)));
                return;
            }

            let due = last_decode.elapsed() >= Duration::from_millis(self.cfg.decode_interval_ms);
            if due && speech_seen && window.len() >= min_decode_samples {
                last_decode = Instant::now();
                match self.decode(&window) {
                    Ok(text) => {
                        if !text.is_empty() && text != last_text {
                            last_text = text.clone();
                            let _ = self.events.send(SessionEvent::Transcript {
                                text,
                                is_final: false,
                            });
                        }
                    }
                    Err(err) => {
                        warn!("whisper decode failed: {err:#}");
                        let _ = self
                            .events
                            .send(SessionEvent::Ended(SessionEnd::Failed(CODE_DECODE_FAILED)));
                        return;
                    }
                }
            }
        }
    }

    /// Run whisper over the current window and return the stitched text.
    fn decode(&self, samples: &[f32]) -> Result<String> {
        let mut state = self
            .ctx
            .create_state()
            .context("failed to create whisper state")?;
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(&self.lang));
        params.set_detect_language(false);
        // Limit CPU usage so the monitor can run all day on a laptop.
        params.set_n_threads(num_cpus::get().min(8) as i32);
        params.set_print_progress(false);
        params.set_print_timestamps(false);
        params.set_print_special(false);
        params.set_print_realtime(false);
        params.set_translate(false);
        params.set_token_timestamps(false);
        state.full(params, samples).context("whisper decode failed")?;

        let mut transcript = String::new();
        let num_segments = state
            .full_n_segments()
            .context("failed to read segment count")?;
        for i in 0..num_segments.max(0) {
            match state.full_get_segment_text_lossy(i) {
                Ok(text) => transcript.push_str(&text),
                Err(err) => warn!("failed to read whisper segment {i}: {err}"),
            }
        }
        Ok(sanitize_transcript(&transcript))
    }
}

#[cfg(unix)]
fn with_stderr_silenced<T, E>(f: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
    use std::os::unix::io::AsRawFd;

    let Ok(null) = std::fs::OpenOptions::new().write(true).open("/dev/null") else {
        return f();
    };
    // SAFETY: dup(2)/dup2(2) on the process stderr descriptor; the original
    // is restored before returning and the duplicate closed on every path.
    unsafe {
        let orig = libc::dup(2);
        if orig < 0 {
            return f();
        }
        if libc::dup2(null.as_raw_fd(), 2) < 0 {
            libc::close(orig);
            return f();
        }
        let result = f();
        libc::dup2(orig, 2);
        libc::close(orig);
        result
    }
}

#[cfg(not(unix))]
fn with_stderr_silenced<T, E>(f: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
    f()
}

fn install_log_silencer() {
    use std::os::raw::{c_char, c_uint, c_void};
    use std::sync::Once;

    unsafe extern "C" fn silent_log_callback(
        _level: c_uint,
        _text: *const c_char,
        _user_data: *mut c_void,
    ) {
        // Drop whisper.cpp's default logger output; tracing owns diagnostics.
    }

    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| unsafe {
        whisper_rs::set_log_callback(Some(silent_log_callback), std::ptr::null_mut());
    });
}
