//! Command-line parsing and validation helpers.

mod defaults;
#[cfg(test)]
mod tests;
mod validation;

use clap::{ArgAction, Parser};

pub use defaults::{
    DEFAULT_ALERT_AUTO_DISMISS_MS, DEFAULT_CAPTURE_RESTART_DELAY_MS, DEFAULT_CHANNEL_CAPACITY,
    DEFAULT_DECODE_INTERVAL_MS, DEFAULT_DECODE_WINDOW_MS, DEFAULT_FRAME_SAMPLES,
    DEFAULT_HEARTBEAT_INTERVAL_MS, DEFAULT_MIN_DECODE_MS, DEFAULT_QUOTA_COOLDOWN_MS,
    DEFAULT_ROTATION_CEILING_MS, DEFAULT_ROTATION_DELAY_MS, DEFAULT_SESSION_SETTLE_MS,
    DEFAULT_SILENCE_THRESHOLD_DB, DEFAULT_SILENCE_WINDOW_MS,
};

/// CLI options for the stationwatch monitor. Validated values keep the engine
/// and the whisper subprocess boundary safe.
#[derive(Debug, Parser, Clone)]
#[command(about = "stationwatch — ambient arrival alerts for transit stations", author, version)]
pub struct AppConfig {
    /// Stations to monitor (primary or transliterated name)
    #[arg(value_name = "STATION")]
    pub targets: Vec<String>,

    /// Print the built-in station catalog and exit
    #[arg(long = "list-stations", default_value_t = false)]
    pub list_stations: bool,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Preferred audio input device name
    #[arg(long)]
    pub input_device: Option<String>,

    /// Announcement language passed to the recognizer
    #[arg(long, env = "STATIONWATCH_LANG", default_value = "zh")]
    pub lang: String,

    /// Allow a networked recognizer when on-device recognition is unavailable
    #[arg(long = "allow-network-stt", default_value_t = false)]
    pub allow_network_stt: bool,

    /// Whisper model name used for auto-discovery under ./models
    #[arg(long, default_value = "base")]
    pub whisper_model: String,

    /// Whisper model path (overrides auto-discovery)
    #[arg(long)]
    pub whisper_model_path: Option<String>,

    /// Extra arrival keyword to match in addition to the built-in list (repeatable)
    #[arg(long = "arrival-keyword", action = ArgAction::Append, value_name = "PHRASE")]
    pub arrival_keywords: Vec<String>,

    /// Recognition session rotation ceiling (milliseconds)
    #[arg(long = "rotation-ceiling-ms", default_value_t = DEFAULT_ROTATION_CEILING_MS)]
    pub rotation_ceiling_ms: u64,

    /// Delay between tearing a session down and starting the next (milliseconds)
    #[arg(long = "rotation-delay-ms", default_value_t = DEFAULT_ROTATION_DELAY_MS)]
    pub rotation_delay_ms: u64,

    /// Settle delay before opening a new session (milliseconds)
    #[arg(long = "session-settle-ms", default_value_t = DEFAULT_SESSION_SETTLE_MS)]
    pub session_settle_ms: u64,

    /// Cooldown after a quota/too-frequent recognizer error (milliseconds)
    #[arg(long = "quota-cooldown-ms", default_value_t = DEFAULT_QUOTA_COOLDOWN_MS)]
    pub quota_cooldown_ms: u64,

    /// Background liveness heartbeat interval (milliseconds)
    #[arg(long = "heartbeat-interval-ms", default_value_t = DEFAULT_HEARTBEAT_INTERVAL_MS)]
    pub heartbeat_interval_ms: u64,

    /// Device-release wait before re-opening capture after a stall (milliseconds)
    #[arg(long = "capture-restart-delay-ms", default_value_t = DEFAULT_CAPTURE_RESTART_DELAY_MS)]
    pub capture_restart_delay_ms: u64,

    /// Auto-dismiss window for an arrival alert (milliseconds)
    #[arg(long = "alert-auto-dismiss-ms", default_value_t = DEFAULT_ALERT_AUTO_DISMISS_MS)]
    pub alert_auto_dismiss_ms: u64,

    /// Audio frame size delivered to the recognizer (samples)
    #[arg(long = "frame-samples", default_value_t = DEFAULT_FRAME_SAMPLES)]
    pub frame_samples: usize,

    /// Frame channel capacity between capture and the recognizer
    #[arg(long = "channel-capacity", default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    pub channel_capacity: usize,

    /// Interval between incremental decodes of the rolling window (milliseconds)
    #[arg(long = "decode-interval-ms", default_value_t = DEFAULT_DECODE_INTERVAL_MS)]
    pub decode_interval_ms: u64,

    /// Rolling audio window the recognizer re-decodes (milliseconds)
    #[arg(long = "decode-window-ms", default_value_t = DEFAULT_DECODE_WINDOW_MS)]
    pub decode_window_ms: u64,

    /// Continuous silence before a session reports no-speech (milliseconds)
    #[arg(long = "silence-window-ms", default_value_t = DEFAULT_SILENCE_WINDOW_MS)]
    pub silence_window_ms: u64,

    /// Energy threshold separating speech from silence (decibels)
    #[arg(long = "silence-threshold-db", default_value_t = DEFAULT_SILENCE_THRESHOLD_DB)]
    pub silence_threshold_db: f32,

    /// Disable the near-silent keep-alive tone while backgrounded
    #[arg(long = "no-keep-alive-tone", default_value_t = false)]
    pub no_keep_alive_tone: bool,

    /// Stay foregrounded: no keep-alive tone, no heartbeat
    #[arg(long = "foreground", default_value_t = false)]
    pub foreground: bool,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "STATIONWATCH_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "STATIONWATCH_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Allow transcript text in logs and diagnostic notifications
    #[arg(long = "log-content", env = "STATIONWATCH_LOG_CONTENT", default_value_t = false)]
    pub log_content: bool,

    /// Ring the terminal bell on arrival alerts
    #[arg(long = "sounds", default_value_t = true, action = ArgAction::Set)]
    pub sounds: bool,
}

impl AppConfig {
    pub fn logging_enabled(&self) -> bool {
        self.logs && !self.no_logs
    }
}

/// Tunable parameters for the monitoring engine. All timing constants are
/// configuration, not authority: the observed platform values drifted across
/// iterations, so defaults sit inside the observed envelopes.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub locale: String,
    pub prefer_on_device: bool,
    pub channel_capacity: usize,
    pub rotation_ceiling_ms: u64,
    pub rotation_delay_ms: u64,
    pub session_settle_ms: u64,
    pub quota_cooldown_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub capture_restart_delay_ms: u64,
    pub alert_auto_dismiss_ms: u64,
    pub extra_keywords: Vec<String>,
    pub log_content: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            locale: "zh".to_string(),
            prefer_on_device: true,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            rotation_ceiling_ms: DEFAULT_ROTATION_CEILING_MS,
            rotation_delay_ms: DEFAULT_ROTATION_DELAY_MS,
            session_settle_ms: DEFAULT_SESSION_SETTLE_MS,
            quota_cooldown_ms: DEFAULT_QUOTA_COOLDOWN_MS,
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            capture_restart_delay_ms: DEFAULT_CAPTURE_RESTART_DELAY_MS,
            alert_auto_dismiss_ms: DEFAULT_ALERT_AUTO_DISMISS_MS,
            extra_keywords: Vec::new(),
            log_content: false,
        }
    }
}

/// Settings for the bundled on-device whisper recognizer.
#[derive(Debug, Clone)]
pub struct RecognizerConfig {
    pub model_path: String,
    pub lang: String,
    pub decode_interval_ms: u64,
    pub decode_window_ms: u64,
    pub min_decode_ms: u64,
    pub silence_threshold_db: f32,
    pub silence_window_ms: u64,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            model_path: String::new(),
            lang: "zh".to_string(),
            decode_interval_ms: DEFAULT_DECODE_INTERVAL_MS,
            decode_window_ms: DEFAULT_DECODE_WINDOW_MS,
            min_decode_ms: DEFAULT_MIN_DECODE_MS,
            silence_threshold_db: DEFAULT_SILENCE_THRESHOLD_DB,
            silence_window_ms: DEFAULT_SILENCE_WINDOW_MS,
        }
    }
}
