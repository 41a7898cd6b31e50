use super::*;
use crate::audio::AudioFrame;
use crate::notify::testing::RecordingDispatcher;
use crate::recognition::{SessionRequest, CODE_NO_SPEECH};
use crate::survival::NullSurvival;
use anyhow::Result;
use crossbeam_channel::unbounded;
use std::sync::atomic::AtomicUsize;
use std::time::Instant;

/// Poll until `cond` holds or the deadline passes. Engine tests drive real
/// timers with millisecond settings, so polling keeps them fast and stable.
fn wait_for(cond: impl Fn() -> bool, what: &str) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return;
        }
        thread::sleep(Duration::from_millis(5));
    }
    panic!("timed out waiting for {what}");
}

/// Hold a condition for a few polls to catch things that should NOT happen.
fn assert_never(cond: impl Fn() -> bool, for_ms: u64, what: &str) {
    let deadline = Instant::now() + Duration::from_millis(for_ms);
    while Instant::now() < deadline {
        assert!(!cond(), "unexpected: {what}");
        thread::sleep(Duration::from_millis(5));
    }
}

fn test_config() -> EngineConfig {
    EngineConfig {
        session_settle_ms: 1,
        rotation_delay_ms: 5,
        quota_cooldown_ms: 30,
        rotation_ceiling_ms: 80,
        heartbeat_interval_ms: 25,
        capture_restart_delay_ms: 2,
        alert_auto_dismiss_ms: 60,
        ..EngineConfig::default()
    }
}

fn central() -> Station {
    Station::new("central", "Central", "Central Station", "Line 1", "Metro")
}

fn guomao() -> Station {
    Station::new("bj-guomao", "国贸", "Guomao", "1号线", "北京")
}

// ---- doubles ----

struct ScriptedCapture {
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
    fail_with: Option<fn() -> CaptureError>,
}

impl ScriptedCapture {
    fn healthy() -> (Self, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let starts = Arc::new(AtomicUsize::new(0));
        let stops = Arc::new(AtomicUsize::new(0));
        (
            Self {
                starts: starts.clone(),
                stops: stops.clone(),
                fail_with: None,
            },
            starts,
            stops,
        )
    }

    fn permission_denied() -> Self {
        let (mut capture, _, _) = Self::healthy();
        capture.fail_with = Some(|| CaptureError::PermissionDenied);
        capture
    }
}

impl AudioCapture for ScriptedCapture {
    fn start(&mut self, _router: Arc<FrameRouter>) -> Result<(), CaptureError> {
        self.starts.fetch_add(1, Ordering::Relaxed);
        match self.fail_with {
            Some(make_err) => Err(make_err()),
            None => Ok(()),
        }
    }

    fn stop(&mut self) {
        self.stops.fetch_add(1, Ordering::Relaxed);
    }
}

struct OpenedSession {
    events: Sender<SessionEvent>,
    _frames: Receiver<AudioFrame>,
}

#[derive(Default)]
struct ScriptedService {
    sessions: Mutex<Vec<OpenedSession>>,
}

impl ScriptedService {
    fn opened(&self) -> usize {
        crate::lock_or_recover(&self.sessions, "scripted sessions").len()
    }

    fn events_for(&self, index: usize) -> Sender<SessionEvent> {
        crate::lock_or_recover(&self.sessions, "scripted sessions")[index]
            .events
            .clone()
    }
}

impl SpeechService for ScriptedService {
    fn open_session(&self, request: SessionRequest) -> Result<Receiver<SessionEvent>> {
        let (events_tx, events_rx) = unbounded();
        crate::lock_or_recover(&self.sessions, "scripted sessions").push(OpenedSession {
            events: events_tx,
            _frames: request.frames,
        });
        Ok(events_rx)
    }
}

struct Fixture {
    handle: MonitorHandle,
    service: Arc<ScriptedService>,
    dispatcher: Arc<RecordingDispatcher>,
    capture_starts: Arc<AtomicUsize>,
    capture_stops: Arc<AtomicUsize>,
}

fn fixture_with(cfg: EngineConfig) -> Fixture {
    let (capture, capture_starts, capture_stops) = ScriptedCapture::healthy();
    let service = Arc::new(ScriptedService::default());
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let handle = MonitorEngine::spawn(
        cfg,
        Box::new(capture),
        service.clone(),
        dispatcher.clone(),
        Box::new(NullSurvival),
    );
    Fixture {
        handle,
        service,
        dispatcher,
        capture_starts,
        capture_stops,
    }
}

fn fixture() -> Fixture {
    fixture_with(test_config())
}

impl Fixture {
    /// Feed a transcript into the most recent session.
    fn transcribe(&self, text: &str) {
        let index = self.service.opened() - 1;
        self.service
            .events_for(index)
            .send(SessionEvent::Transcript {
                text: text.to_string(),
                is_final: false,
            })
            .expect("engine should still be pumping session events");
    }
}

// ---- lifecycle ----

#[test]
fn first_target_starts_monitoring_and_opens_one_session() {
    let fx = fixture();
    fx.handle.add_target(central());

    wait_for(
        || fx.handle.status().state == EngineState::Monitoring,
        "monitoring state",
    );
    wait_for(|| fx.service.opened() == 1, "first session");
    assert_eq!(fx.capture_starts.load(Ordering::Relaxed), 1);
    assert_eq!(fx.handle.board().sessions_opened(), 1);
}

#[test]
fn removing_last_target_returns_to_idle_and_stops_capture() {
    let fx = fixture();
    fx.handle.add_target(central());
    wait_for(|| fx.service.opened() == 1, "first session");

    fx.handle.remove_target(central().id);
    wait_for(
        || fx.handle.status().state == EngineState::Idle,
        "idle state",
    );
    wait_for(
        || fx.capture_stops.load(Ordering::Relaxed) >= 1,
        "capture stop",
    );
    // All session timers were invalidated: no further sessions appear.
    assert_never(|| fx.service.opened() > 1, 50, "session after stop");
}

#[test]
fn duplicate_target_add_is_a_no_op() {
    let fx = fixture();
    fx.handle.add_target(central());
    fx.handle.add_target(central());
    wait_for(|| fx.service.opened() == 1, "first session");
    assert_eq!(fx.handle.status().targets.len(), 1);
}

#[test]
fn permission_denied_is_fatal_to_starting() {
    let service = Arc::new(ScriptedService::default());
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let handle = MonitorEngine::spawn(
        test_config(),
        Box::new(ScriptedCapture::permission_denied()),
        service.clone(),
        dispatcher.clone(),
        Box::new(NullSurvival),
    );

    handle.add_target(central());
    wait_for(
        || dispatcher.debug_notes.load(Ordering::Relaxed) >= 1,
        "permission diagnostic",
    );
    assert_eq!(handle.status().state, EngineState::Idle);
    assert!(handle.status().targets.is_empty());
    assert_never(|| service.opened() > 0, 50, "session despite denied permission");
}

// ---- matching and alerting ----

#[test]
fn arrival_announcement_matches_removes_target_and_alerts() {
    let fx = fixture();
    fx.handle.add_target(central());
    wait_for(|| fx.service.opened() == 1, "first session");

    fx.transcribe("next station Central");

    wait_for(|| fx.dispatcher.arrival_count() == 1, "arrival dispatch");
    let status = fx.handle.status();
    assert!(status.targets.is_empty());
    assert!(status.active_alerts.contains(&"Central".to_string()));
    // Last target gone: the engine idles itself while the alert stays up.
    wait_for(
        || fx.handle.status().state == EngineState::Idle,
        "idle after match",
    );
}

#[test]
fn name_without_keyword_does_not_alert() {
    let fx = fixture();
    fx.handle.add_target(central());
    wait_for(|| fx.service.opened() == 1, "first session");

    fx.transcribe("Central is a large interchange");

    assert_never(
        || fx.dispatcher.arrival_count() > 0,
        50,
        "alert without keyword",
    );
    assert_eq!(fx.handle.status().targets.len(), 1);
}

#[test]
fn bare_station_name_matches_via_exact_branch() {
    let fx = fixture();
    fx.handle.add_target(central());
    wait_for(|| fx.service.opened() == 1, "first session");

    fx.transcribe("Central");

    wait_for(|| fx.dispatcher.arrival_count() == 1, "arrival dispatch");
}

#[test]
fn matching_one_of_two_targets_keeps_monitoring_the_other() {
    let fx = fixture();
    fx.handle.add_target(central());
    fx.handle.add_target(guomao());
    wait_for(|| fx.service.opened() == 1, "first session");

    fx.transcribe("下一站国贸");

    wait_for(|| fx.dispatcher.arrival_count() == 1, "arrival dispatch");
    let status = fx.handle.status();
    assert_eq!(status.state, EngineState::Monitoring);
    assert_eq!(status.targets, vec!["Central".to_string()]);
}

#[test]
fn alert_auto_dismisses_after_the_configured_window() {
    let fx = fixture();
    fx.handle.add_target(central());
    wait_for(|| fx.service.opened() == 1, "first session");

    fx.transcribe("next station Central");
    wait_for(|| fx.dispatcher.arrival_count() == 1, "arrival dispatch");
    wait_for(
        || fx.handle.status().active_alerts.is_empty(),
        "alert auto-dismiss",
    );
}

#[test]
fn explicit_dismiss_removes_the_alert_immediately() {
    let fx = fixture();
    fx.handle.add_target(central());
    wait_for(|| fx.service.opened() == 1, "first session");

    fx.transcribe("next station Central");
    wait_for(|| !fx.handle.status().active_alerts.is_empty(), "alert raised");

    fx.handle.dismiss_alert(central().id);
    wait_for(
        || fx.handle.status().active_alerts.is_empty(),
        "alert dismissed",
    );
}

#[test]
fn explicit_stop_clears_targets_and_alerts() {
    let fx = fixture();
    fx.handle.add_target(central());
    fx.handle.add_target(guomao());
    wait_for(|| fx.service.opened() == 1, "first session");

    fx.transcribe("下一站国贸");
    wait_for(|| !fx.handle.status().active_alerts.is_empty(), "alert raised");

    fx.handle.stop();
    wait_for(
        || {
            let status = fx.handle.status();
            status.state == EngineState::Idle
                && status.targets.is_empty()
                && status.active_alerts.is_empty()
        },
        "engine cleared",
    );
}

// ---- rotation ----

#[test]
fn session_rotates_at_the_ceiling_with_targets_unchanged() {
    let fx = fixture();
    fx.handle.add_target(central());
    wait_for(|| fx.service.opened() == 1, "first session");

    wait_for(|| fx.service.opened() == 2, "rotated session");
    assert!(fx.handle.board().rotations() >= 1);
    assert_eq!(fx.handle.status().targets, vec!["Central".to_string()]);
    assert_eq!(fx.handle.status().state, EngineState::Monitoring);
}

#[test]
fn silence_failure_rotates_immediately() {
    let fx = fixture();
    fx.handle.add_target(central());
    wait_for(|| fx.service.opened() == 1, "first session");

    fx.service
        .events_for(0)
        .send(SessionEvent::Ended(SessionEnd::Failed(CODE_NO_SPEECH)))
        .expect("send terminal event");

    wait_for(|| fx.service.opened() == 2, "replacement session");
    assert_eq!(fx.dispatcher.arrival_count(), 0);
}

#[test]
fn stale_session_events_are_ignored_after_rotation() {
    let fx = fixture();
    fx.handle.add_target(central());
    wait_for(|| fx.service.opened() == 1, "first session");
    let first = fx.service.events_for(0);

    fx.service
        .events_for(0)
        .send(SessionEvent::Ended(SessionEnd::Failed(CODE_NO_SPEECH)))
        .expect("send terminal event");
    wait_for(|| fx.service.opened() == 2, "replacement session");

    // A transcript from the dead session must not match anything.
    let _ = first.send(SessionEvent::Transcript {
        text: "next station Central".to_string(),
        is_final: false,
    });
    assert_never(
        || fx.dispatcher.arrival_count() > 0,
        50,
        "match from stale session",
    );
}

// ---- background survival ----

#[test]
fn stalled_pipeline_forces_exactly_one_restart_per_heartbeat() {
    let fx = fixture();
    fx.handle.add_target(central());
    wait_for(|| fx.service.opened() == 1, "first session");

    // Backgrounding starts the heartbeat; the scripted capture never
    // delivers frames, so the first tick sees a stalled pipeline.
    fx.handle.set_backgrounded(true);
    wait_for(|| fx.handle.board().forced_restarts() >= 1, "forced restart");
    wait_for(
        || fx.capture_starts.load(Ordering::Relaxed) >= 2,
        "capture restarted",
    );
    assert!(fx.capture_stops.load(Ordering::Relaxed) >= 1);
}

#[test]
fn foregrounding_stops_the_heartbeat_but_not_monitoring() {
    let fx = fixture();
    fx.handle.add_target(central());
    wait_for(|| fx.service.opened() == 1, "first session");

    fx.handle.set_backgrounded(true);
    wait_for(|| fx.handle.board().forced_restarts() >= 1, "heartbeat ran");

    fx.handle.set_backgrounded(false);
    let restarts = fx.handle.board().forced_restarts();
    assert_never(
        || fx.handle.board().forced_restarts() > restarts + 1,
        80,
        "heartbeat still running after foreground",
    );
    assert_eq!(fx.handle.status().state, EngineState::Monitoring);
}

#[test]
fn grant_expiry_rotates_the_session() {
    let fx = fixture();
    fx.handle.add_target(central());
    wait_for(|| fx.service.opened() == 1, "first session");

    // On a real platform the survival strategy sends this as its grant
    // nears the hard deadline.
    let rotations_before = fx.handle.board().rotations();
    fx.handle
        .events()
        .send(EngineEvent::GrantExpiring)
        .expect("engine should be running");

    wait_for(|| fx.service.opened() == 2, "session rotated before deadline");
    assert!(fx.handle.board().rotations() > rotations_before);
}
