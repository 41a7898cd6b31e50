use super::defaults::{
    FORBIDDEN_DEVICE_CHARS, ISO_639_1_CODES, MAX_KEYWORDS, MAX_KEYWORD_BYTES,
    MAX_ROTATION_CEILING_MS,
};
use super::{AppConfig, EngineConfig, RecognizerConfig};
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values and normalize paths.
    pub fn validate(&mut self) -> Result<()> {
        if self.rotation_ceiling_ms < 5_000 || self.rotation_ceiling_ms > MAX_ROTATION_CEILING_MS {
            bail!(
                "--rotation-ceiling-ms must be between 5000 and {MAX_ROTATION_CEILING_MS}, got {}",
                self.rotation_ceiling_ms
            );
        }
        if self.rotation_delay_ms > 30_000 {
            bail!(
                "--rotation-delay-ms must be at most 30000, got {}",
                self.rotation_delay_ms
            );
        }
        if self.session_settle_ms > 5_000 {
            bail!(
                "--session-settle-ms must be at most 5000, got {}",
                self.session_settle_ms
            );
        }
        if self.quota_cooldown_ms < self.rotation_delay_ms || self.quota_cooldown_ms > 60_000 {
            bail!(
                "--quota-cooldown-ms must be between --rotation-delay-ms ({}) and 60000",
                self.rotation_delay_ms
            );
        }
        if !(1_000..=120_000).contains(&self.heartbeat_interval_ms) {
            bail!(
                "--heartbeat-interval-ms must be between 1000 and 120000, got {}",
                self.heartbeat_interval_ms
            );
        }
        if self.capture_restart_delay_ms > self.heartbeat_interval_ms {
            bail!(
                "--capture-restart-delay-ms ({}) cannot exceed --heartbeat-interval-ms ({})",
                self.capture_restart_delay_ms,
                self.heartbeat_interval_ms
            );
        }
        if !(1_000..=600_000).contains(&self.alert_auto_dismiss_ms) {
            bail!(
                "--alert-auto-dismiss-ms must be between 1000 and 600000, got {}",
                self.alert_auto_dismiss_ms
            );
        }
        if !(256..=16_384).contains(&self.frame_samples) {
            bail!(
                "--frame-samples must be between 256 and 16384, got {}",
                self.frame_samples
            );
        }
        if !(8..=1_024).contains(&self.channel_capacity) {
            bail!(
                "--channel-capacity must be between 8 and 1024, got {}",
                self.channel_capacity
            );
        }
        if !(200..=30_000).contains(&self.decode_interval_ms) {
            bail!(
                "--decode-interval-ms must be between 200 and 30000, got {}",
                self.decode_interval_ms
            );
        }
        if self.decode_window_ms < self.decode_interval_ms || self.decode_window_ms > 30_000 {
            bail!(
                "--decode-window-ms must be between --decode-interval-ms ({}) and 30000",
                self.decode_interval_ms
            );
        }
        if self.silence_window_ms < self.decode_interval_ms || self.silence_window_ms > 60_000 {
            bail!(
                "--silence-window-ms must be between --decode-interval-ms ({}) and 60000",
                self.decode_interval_ms
            );
        }
        if !(-120.0..=0.0).contains(&self.silence_threshold_db) {
            bail!(
                "--silence-threshold-db must be between -120.0 and 0.0 dB, got {}",
                self.silence_threshold_db
            );
        }

        self.validate_lang()?;
        self.validate_keywords()?;
        self.validate_input_device()?;
        self.resolve_model_path()?;

        Ok(())
    }

    fn validate_lang(&self) -> Result<()> {
        if self.lang.trim().is_empty() {
            bail!("--lang must not be empty");
        }
        if !self
            .lang
            .chars()
            .all(|ch| ch.is_ascii_alphabetic() || ch == '-' || ch == '_')
        {
            bail!("--lang must contain only alphabetic characters or '-'/'_' separators");
        }
        // Allow locale-style values but only check the leading ISO-639-1 code.
        let primary = self
            .lang
            .split(['-', '_'])
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        if !ISO_639_1_CODES.contains(&primary.as_str()) {
            bail!(
                "--lang must start with a valid ISO-639-1 code, got '{}'",
                self.lang
            );
        }
        Ok(())
    }

    fn validate_keywords(&self) -> Result<()> {
        if self.arrival_keywords.len() > MAX_KEYWORDS {
            bail!(
                "--arrival-keyword repeated too many times (max {MAX_KEYWORDS}, got {})",
                self.arrival_keywords.len()
            );
        }
        for keyword in &self.arrival_keywords {
            if keyword.trim().is_empty() {
                bail!("--arrival-keyword must not be empty");
            }
            if keyword.len() > MAX_KEYWORD_BYTES {
                bail!("--arrival-keyword must be at most {MAX_KEYWORD_BYTES} bytes");
            }
        }
        Ok(())
    }

    fn validate_input_device(&self) -> Result<()> {
        if let Some(device) = &self.input_device {
            if device.len() > 256
                || device.chars().any(|ch| ch.is_control())
                || device.chars().any(|ch| FORBIDDEN_DEVICE_CHARS.contains(&ch))
            {
                bail!(
                    "--input-device must be <=256 characters with no control or shell metacharacters"
                );
            }
        }
        Ok(())
    }

    /// Fill in --whisper-model-path from ./models when absent, then pin a
    /// canonical absolute path so later chdirs cannot break the recognizer.
    fn resolve_model_path(&mut self) -> Result<()> {
        if self.whisper_model_path.is_none() {
            if let Some(auto_model) = discover_default_model(&self.whisper_model) {
                self.whisper_model_path = Some(auto_model.to_string_lossy().to_string());
            }
        }

        if let Some(model) = &mut self.whisper_model_path {
            let model_path = Path::new(model);
            if !model_path.exists() {
                bail!("whisper model path '{}' does not exist", model_path.display());
            }
            let canonical = model_path
                .canonicalize()
                .with_context(|| format!("failed to canonicalize whisper model path '{model}'"))?;
            *model = canonical
                .to_str()
                .map(|s| s.to_string())
                .ok_or_else(|| anyhow!("whisper model path must be valid UTF-8"))?;
        }
        Ok(())
    }

    /// Snapshot the engine-facing tunables.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            locale: self.lang.clone(),
            prefer_on_device: !self.allow_network_stt,
            channel_capacity: self.channel_capacity,
            rotation_ceiling_ms: self.rotation_ceiling_ms,
            rotation_delay_ms: self.rotation_delay_ms,
            session_settle_ms: self.session_settle_ms,
            quota_cooldown_ms: self.quota_cooldown_ms,
            heartbeat_interval_ms: self.heartbeat_interval_ms,
            capture_restart_delay_ms: self.capture_restart_delay_ms,
            alert_auto_dismiss_ms: self.alert_auto_dismiss_ms,
            extra_keywords: self.arrival_keywords.clone(),
            log_content: self.log_content,
        }
    }

    /// Snapshot the recognizer-facing tunables. Errors when no model path was
    /// supplied or discovered.
    pub fn recognizer_config(&self) -> Result<RecognizerConfig> {
        let model_path = self.whisper_model_path.clone().ok_or_else(|| {
            anyhow!(
                "no whisper model found; pass --whisper-model-path or place a \
                 ggml model under ./models"
            )
        })?;
        Ok(RecognizerConfig {
            model_path,
            lang: self
                .lang
                .split(['-', '_'])
                .next()
                .unwrap_or("zh")
                .to_ascii_lowercase(),
            decode_interval_ms: self.decode_interval_ms,
            decode_window_ms: self.decode_window_ms,
            min_decode_ms: super::DEFAULT_MIN_DECODE_MS,
            silence_threshold_db: self.silence_threshold_db,
            silence_window_ms: self.silence_window_ms,
        })
    }
}

/// Try to locate a ggml model in ./models so the monitor works out of the box
/// when users haven't provided --whisper-model-path.
pub(super) fn discover_default_model(model_name: &str) -> Option<PathBuf> {
    let models_dir = Path::new("models");
    if !models_dir.exists() {
        return None;
    }

    let candidates = [
        models_dir.join(format!("ggml-{model_name}.bin")),
        models_dir.join(format!("ggml-{model_name}.en.bin")),
        models_dir.join("ggml-base.bin"),
        models_dir.join("ggml-base.en.bin"),
    ];

    for candidate in candidates {
        if candidate.exists() {
            if let Ok(canonical) = candidate.canonicalize() {
                return Some(canonical);
            }
        }
    }

    None
}
