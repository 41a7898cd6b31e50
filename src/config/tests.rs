use super::AppConfig;
use clap::Parser;

fn parse(args: &[&str]) -> AppConfig {
    let mut argv = vec!["stationwatch"];
    argv.extend_from_slice(args);
    AppConfig::parse_from(argv)
}

#[test]
fn defaults_validate() {
    let mut cfg = parse(&[]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_rotation_ceiling_out_of_bounds() {
    let mut cfg = parse(&["--rotation-ceiling-ms", "1000"]);
    assert!(cfg.validate().is_err());

    let mut cfg = parse(&["--rotation-ceiling-ms", "600000"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn accepts_rotation_ceiling_within_observed_envelope() {
    for ceiling in ["40000", "45000", "50000"] {
        let mut cfg = parse(&["--rotation-ceiling-ms", ceiling]);
        assert!(cfg.validate().is_ok(), "ceiling {ceiling} should validate");
    }
}

#[test]
fn rejects_quota_cooldown_below_rotation_delay() {
    let mut cfg = parse(&["--rotation-delay-ms", "5000", "--quota-cooldown-ms", "2000"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_heartbeat_interval_out_of_bounds() {
    let mut cfg = parse(&["--heartbeat-interval-ms", "100"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_capture_restart_delay_longer_than_heartbeat() {
    let mut cfg = parse(&[
        "--heartbeat-interval-ms",
        "2000",
        "--capture-restart-delay-ms",
        "3000",
    ]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_invalid_language_code() {
    let mut cfg = parse(&["--lang", "zh$"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_unknown_primary_language() {
    let mut cfg = parse(&["--lang", "zz-ZZ"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn accepts_language_with_region_suffix() {
    let mut cfg = parse(&["--lang", "zh-CN"]);
    assert!(cfg.validate().is_ok());
    let mut cfg = parse(&["--lang", "en_US"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_empty_arrival_keyword() {
    let mut cfg = parse(&["--arrival-keyword", "  "]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_input_device_with_shell_metacharacters() {
    let mut cfg = parse(&["--input-device", "mic;rm -rf /"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_silence_threshold_out_of_range() {
    let mut cfg = parse(&["--silence-threshold-db", "5.0"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_decode_window_smaller_than_interval() {
    let mut cfg = parse(&["--decode-interval-ms", "2000", "--decode-window-ms", "1000"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn engine_config_carries_locale_and_on_device_preference() {
    let mut cfg = parse(&["--lang", "zh-CN"]);
    cfg.validate().expect("defaults should validate");
    let engine = cfg.engine_config();
    assert_eq!(engine.locale, "zh-CN");
    assert!(engine.prefer_on_device);

    let mut cfg = parse(&["--allow-network-stt"]);
    cfg.validate().expect("defaults should validate");
    assert!(!cfg.engine_config().prefer_on_device);
}

#[test]
fn recognizer_config_requires_a_model() {
    let mut cfg = parse(&[]);
    cfg.validate().expect("defaults should validate");
    if cfg.whisper_model_path.is_none() {
        assert!(cfg.recognizer_config().is_err());
    }
}

#[test]
fn recognizer_config_uses_primary_language_subtag() {
    let mut cfg = parse(&["--lang", "zh-CN"]);
    cfg.validate().expect("defaults should validate");
    cfg.whisper_model_path = Some("/tmp/model.bin".to_string());
    let recognizer = cfg.recognizer_config().expect("model path set");
    assert_eq!(recognizer.lang, "zh");
}

#[test]
fn logging_enabled_respects_no_logs_override() {
    let cfg = parse(&["--logs"]);
    assert!(cfg.logging_enabled());
    let cfg = parse(&["--logs", "--no-logs"]);
    assert!(!cfg.logging_enabled());
}
