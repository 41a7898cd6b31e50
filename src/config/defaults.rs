// Rotation ceiling sits inside the observed 40-50s envelope the platform
// tolerates before force-terminating a recognition task.
pub const DEFAULT_ROTATION_CEILING_MS: u64 = 45_000;
pub const DEFAULT_ROTATION_DELAY_MS: u64 = 1_000;
pub const DEFAULT_SESSION_SETTLE_MS: u64 = 100;
pub const DEFAULT_QUOTA_COOLDOWN_MS: u64 = 3_000;
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 10_000;
pub const DEFAULT_CAPTURE_RESTART_DELAY_MS: u64 = 200;
pub const DEFAULT_ALERT_AUTO_DISMISS_MS: u64 = 60_000;
pub const DEFAULT_FRAME_SAMPLES: usize = 1_024;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;
pub const DEFAULT_DECODE_INTERVAL_MS: u64 = 1_500;
pub const DEFAULT_DECODE_WINDOW_MS: u64 = 12_000;
pub const DEFAULT_MIN_DECODE_MS: u64 = 600;
pub const DEFAULT_SILENCE_THRESHOLD_DB: f32 = -55.0;
pub const DEFAULT_SILENCE_WINDOW_MS: u64 = 8_000;

pub(super) const MAX_ROTATION_CEILING_MS: u64 = 120_000;
pub(super) const MAX_KEYWORDS: usize = 32;
pub(super) const MAX_KEYWORD_BYTES: usize = 128;
pub(super) const ISO_639_1_CODES: &[&str] = &[
    "af", "am", "ar", "az", "be", "bg", "bn", "bs", "ca", "cs", "cy", "da", "de", "el", "en", "es",
    "et", "eu", "fa", "fi", "fil", "fr", "ga", "gl", "gu", "he", "hi", "hr", "hu", "hy", "id",
    "is", "it", "ja", "jv", "ka", "kk", "km", "kn", "ko", "lo", "lt", "lv", "mk", "ml", "mn", "mr",
    "ms", "my", "ne", "nl", "no", "pa", "pl", "pt", "ro", "ru", "si", "sk", "sl", "sq", "sr", "sv",
    "sw", "ta", "te", "th", "tr", "uk", "ur", "vi", "zh",
];
// Device names travel into cpal device matching; strip control characters and
// anything that could leak into diagnostics as markup.
pub(super) const FORBIDDEN_DEVICE_CHARS: &[char] =
    &[';', '|', '&', '$', '`', '<', '>', '\\', '\'', '"'];
