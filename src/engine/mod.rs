//! The monitoring engine: one coordination thread that owns everything.
//!
//! Target-set mutation, scheduler transitions, and alert state all live on a
//! single event loop. Timers, audio callbacks, and recognition sessions never
//! touch shared state; they send [`EngineEvent`]s and the loop serializes
//! them. Stale timers and stale session events are dropped by epoch, so a
//! rotation timer that fires during teardown can never act on the session
//! that replaced its own.

pub mod scheduler;
#[cfg(test)]
mod tests;

use crate::alert::AlertCoordinator;
use crate::audio::{AudioCapture, CaptureError, FrameRouter};
use crate::config::EngineConfig;
use crate::matcher::MatchDetector;
use crate::notify::AlertDispatcher;
use crate::recognition::{
    RecognitionSession, SessionEnd, SessionEvent, SessionSpec, SpeechService,
};
use crate::station::{Station, StationId};
use crate::survival::{SurvivalController, SurvivalStrategy};
use crate::timer;
use crossbeam_channel::{unbounded, Receiver, Sender};
use scheduler::{classify, rotation_backoff, ErrorClass, Phase, RotateReason};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Process-wide engine lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    #[default]
    Idle,
    Monitoring,
}

/// Everything the loop reacts to. External callers go through
/// [`MonitorHandle`]; timers and sessions send the epoch-tagged variants.
#[derive(Debug)]
pub enum EngineEvent {
    AddTarget(Station),
    RemoveTarget(StationId),
    DismissAlert(StationId),
    StopMonitoring,
    Backgrounded,
    Foregrounded,
    Shutdown,
    Session { epoch: u64, event: SessionEvent },
    RotationDue { epoch: u64 },
    RotateDelayElapsed { epoch: u64 },
    SettleElapsed { epoch: u64 },
    CaptureRestartDue,
    HeartbeatTick,
    GrantExpiring,
    AlertExpired { id: StationId, generation: u64 },
}

/// Observable engine state, updated by the loop and read by callers.
#[derive(Debug, Clone, Default)]
pub struct StatusSnapshot {
    pub state: EngineState,
    pub targets: Vec<String>,
    pub last_transcript: String,
    pub active_alerts: Vec<String>,
}

#[derive(Debug, Default)]
pub struct StatusBoard {
    inner: Mutex<StatusSnapshot>,
    sessions_opened: AtomicU64,
    rotations: AtomicU64,
    forced_restarts: AtomicU64,
}

impl StatusBoard {
    pub fn snapshot(&self) -> StatusSnapshot {
        crate::lock_or_recover(&self.inner, "status board").clone()
    }

    pub fn sessions_opened(&self) -> u64 {
        self.sessions_opened.load(Ordering::Relaxed)
    }

    pub fn rotations(&self) -> u64 {
        self.rotations.load(Ordering::Relaxed)
    }

    pub fn forced_restarts(&self) -> u64 {
        self.forced_restarts.load(Ordering::Relaxed)
    }
}

/// Caller-facing handle. All methods enqueue events; nothing blocks on the
/// loop. Dropping the handle shuts the engine down.
pub struct MonitorHandle {
    tx: Sender<EngineEvent>,
    status: Arc<StatusBoard>,
    thread: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    pub fn add_target(&self, station: Station) {
        let _ = self.tx.send(EngineEvent::AddTarget(station));
    }

    pub fn remove_target(&self, id: StationId) {
        let _ = self.tx.send(EngineEvent::RemoveTarget(id));
    }

    pub fn dismiss_alert(&self, id: StationId) {
        let _ = self.tx.send(EngineEvent::DismissAlert(id));
    }

    /// Explicit engine stop: targets, session, capture, and alerts all go.
    pub fn stop(&self) {
        let _ = self.tx.send(EngineEvent::StopMonitoring);
    }

    pub fn set_backgrounded(&self, backgrounded: bool) {
        let event = if backgrounded {
            EngineEvent::Backgrounded
        } else {
            EngineEvent::Foregrounded
        };
        let _ = self.tx.send(event);
    }

    pub fn status(&self) -> StatusSnapshot {
        self.status.snapshot()
    }

    pub fn board(&self) -> &StatusBoard {
        &self.status
    }

    pub fn shutdown(mut self) {
        self.shutdown_inner();
    }

    #[cfg(test)]
    pub(crate) fn events(&self) -> Sender<EngineEvent> {
        self.tx.clone()
    }

    fn shutdown_inner(&mut self) {
        let _ = self.tx.send(EngineEvent::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.shutdown_inner();
    }
}

pub struct MonitorEngine {
    cfg: EngineConfig,
    capture: Box<dyn AudioCapture>,
    service: Arc<dyn SpeechService>,
    dispatcher: Arc<dyn AlertDispatcher>,
    survival: SurvivalController,
    router: Arc<FrameRouter>,
    detector: MatchDetector,
    alerts: AlertCoordinator,

    state: EngineState,
    phase: Phase,
    epoch: u64,
    session: Option<RecognitionSession>,
    targets: Vec<Station>,
    foreground: bool,
    heartbeat_frames_seen: u64,
    permission_surfaced: bool,

    status: Arc<StatusBoard>,
    tx: Sender<EngineEvent>,
    rx: Receiver<EngineEvent>,
}

impl MonitorEngine {
    /// Build the engine and start its coordination thread.
    pub fn spawn(
        cfg: EngineConfig,
        capture: Box<dyn AudioCapture>,
        service: Arc<dyn SpeechService>,
        dispatcher: Arc<dyn AlertDispatcher>,
        strategy: Box<dyn SurvivalStrategy>,
    ) -> MonitorHandle {
        let (tx, rx) = unbounded();
        let status = Arc::new(StatusBoard::default());
        let detector = MatchDetector::new(&cfg.extra_keywords);
        let engine = MonitorEngine {
            cfg,
            capture,
            service,
            dispatcher,
            survival: SurvivalController::new(strategy),
            router: Arc::new(FrameRouter::new()),
            detector,
            alerts: AlertCoordinator::new(),
            state: EngineState::Idle,
            phase: Phase::Stopped,
            epoch: 0,
            session: None,
            targets: Vec::new(),
            foreground: true,
            heartbeat_frames_seen: 0,
            permission_surfaced: false,
            status: status.clone(),
            tx: tx.clone(),
            rx,
        };
        let thread = thread::spawn(move || engine.run());
        MonitorHandle {
            tx,
            status,
            thread: Some(thread),
        }
    }

    fn run(mut self) {
        while let Ok(event) = self.rx.recv() {
            if !self.handle_event(event) {
                break;
            }
        }
    }

    fn handle_event(&mut self, event: EngineEvent) -> bool {
        match event {
            EngineEvent::AddTarget(station) => self.on_add_target(station),
            EngineEvent::RemoveTarget(id) => self.on_remove_target(&id),
            EngineEvent::DismissAlert(id) => {
                self.alerts.dismiss(&id);
                self.publish_alerts();
            }
            EngineEvent::StopMonitoring => self.stop_all(),
            EngineEvent::Backgrounded => self.on_backgrounded(),
            EngineEvent::Foregrounded => self.on_foregrounded(),
            EngineEvent::Shutdown => {
                self.stop_all();
                return false;
            }
            EngineEvent::Session { epoch, event } => self.on_session_event(epoch, event),
            EngineEvent::RotationDue { epoch } => self.on_rotation_due(epoch),
            EngineEvent::RotateDelayElapsed { epoch } => self.on_rotate_delay_elapsed(epoch),
            EngineEvent::SettleElapsed { epoch } => self.on_settle_elapsed(epoch),
            EngineEvent::CaptureRestartDue => self.on_capture_restart_due(),
            EngineEvent::HeartbeatTick => self.on_heartbeat(),
            EngineEvent::GrantExpiring => self.on_grant_expiring(),
            EngineEvent::AlertExpired { id, generation } => {
                if self.alerts.expire(&id, generation) {
                    debug!(station = %id, "alert auto-dismissed");
                    self.publish_alerts();
                }
            }
        }
        true
    }

    // ---- target set ----

    fn on_add_target(&mut self, station: Station) {
        if self.targets.iter().any(|t| t.id == station.id) {
            return;
        }
        info!(station = %station.id, "target added");
        self.dispatcher.start_status(&station.name);
        self.dispatcher
            .update_status(&station.name, "waiting for announcement");
        self.targets.push(station);
        self.publish_targets();
        if self.state == EngineState::Idle {
            self.start_monitoring();
        }
    }

    fn on_remove_target(&mut self, id: &StationId) {
        let Some(index) = self.targets.iter().position(|t| &t.id == id) else {
            return;
        };
        let station = self.targets.remove(index);
        info!(station = %station.id, "target removed");
        self.dispatcher.stop_status(&station.name);
        self.publish_targets();
        if self.targets.is_empty() && self.state == EngineState::Monitoring {
            self.stop_listening();
        }
    }

    // ---- lifecycle ----

    fn start_monitoring(&mut self) {
        match self.try_start_capture() {
            Ok(()) | Err(CaptureError::Unavailable(_)) => {
                // Unavailable is retried through the restart path; monitoring
                // proceeds so a session is ready the moment capture recovers.
            }
            Err(CaptureError::PermissionDenied) => {
                // Fatal to starting; roll the add back.
                for station in self.targets.drain(..) {
                    self.dispatcher.stop_status(&station.name);
                }
                self.publish_targets();
                return;
            }
        }
        self.state = EngineState::Monitoring;
        self.heartbeat_frames_seen = self.router.delivered();
        info!("monitoring started");
        self.publish_state();
        if !self.foreground {
            self.survival.engage(
                Duration::from_millis(self.cfg.heartbeat_interval_ms),
                self.tx.clone(),
            );
        }
        self.epoch += 1;
        self.enter_starting();
    }

    /// Tear down everything owned by the monitoring state: pending timers
    /// (by epoch), the session, capture, and the survival grant. Alert
    /// records keep their own timers and survive this.
    fn stop_listening(&mut self) {
        self.epoch += 1;
        self.phase = Phase::Stopped;
        self.end_session();
        self.capture.stop();
        self.survival.release();
        self.state = EngineState::Idle;
        self.publish_state();
        info!("monitoring stopped");
    }

    /// Explicit engine stop: also clears targets and alert records.
    fn stop_all(&mut self) {
        if self.state == EngineState::Monitoring {
            self.stop_listening();
        }
        for station in self.targets.drain(..) {
            self.dispatcher.stop_status(&station.name);
        }
        self.alerts.clear();
        self.publish_targets();
        self.publish_alerts();
    }

    fn try_start_capture(&mut self) -> Result<(), CaptureError> {
        match self.capture.start(self.router.clone()) {
            Ok(()) => Ok(()),
            Err(CaptureError::PermissionDenied) => {
                if !self.permission_surfaced {
                    self.permission_surfaced = true;
                    error!("microphone permission denied; monitoring cannot start");
                    self.dispatcher
                        .debug_notify("microphone permission denied; monitoring cannot start");
                }
                Err(CaptureError::PermissionDenied)
            }
            Err(CaptureError::Unavailable(reason)) => {
                warn!("capture unavailable: {reason}");
                self.dispatcher
                    .debug_notify(&format!("capture unavailable ({reason}); will retry"));
                if !self.survival.is_engaged() {
                    // No heartbeat running, so the retry has to schedule
                    // itself; paced at the heartbeat interval either way.
                    timer::schedule(
                        Duration::from_millis(self.cfg.heartbeat_interval_ms),
                        self.tx.clone(),
                        EngineEvent::CaptureRestartDue,
                    );
                }
                Err(CaptureError::Unavailable(reason))
            }
        }
    }

    // ---- session scheduling ----

    fn enter_starting(&mut self) {
        self.phase = Phase::Starting;
        timer::schedule(
            Duration::from_millis(self.cfg.session_settle_ms),
            self.tx.clone(),
            EngineEvent::SettleElapsed { epoch: self.epoch },
        );
    }

    fn on_settle_elapsed(&mut self, epoch: u64) {
        if epoch != self.epoch || self.phase != Phase::Starting {
            return;
        }
        if self.state != EngineState::Monitoring {
            return;
        }
        self.open_session();
    }

    fn open_session(&mut self) {
        let spec = SessionSpec {
            locale: self.cfg.locale.clone(),
            prefer_on_device: self.cfg.prefer_on_device,
            channel_capacity: self.cfg.channel_capacity,
        };
        let events = self.tx.clone();
        let deliver = move |epoch: u64, event: SessionEvent| {
            let _ = events.send(EngineEvent::Session { epoch, event });
        };
        match RecognitionSession::open(self.epoch, &self.service, &self.router, &spec, deliver) {
            Ok(session) => {
                self.session = Some(session);
                self.phase = Phase::Active;
                self.status.sessions_opened.fetch_add(1, Ordering::Relaxed);
                // Pre-empt the platform's forced termination instead of
                // reacting to it.
                timer::schedule(
                    Duration::from_millis(self.cfg.rotation_ceiling_ms),
                    self.tx.clone(),
                    EngineEvent::RotationDue { epoch: self.epoch },
                );
            }
            Err(err) => {
                warn!("failed to open recognition session: {err:#}");
                self.epoch += 1;
                self.phase = Phase::Rotating;
                timer::schedule(
                    Duration::from_millis(self.cfg.rotation_delay_ms),
                    self.tx.clone(),
                    EngineEvent::RotateDelayElapsed { epoch: self.epoch },
                );
            }
        }
    }

    fn on_rotation_due(&mut self, epoch: u64) {
        if epoch != self.epoch || self.phase != Phase::Active {
            return;
        }
        self.rotate(
            RotateReason::Ceiling,
            Duration::from_millis(self.cfg.rotation_delay_ms),
        );
    }

    fn on_rotate_delay_elapsed(&mut self, epoch: u64) {
        if epoch != self.epoch || self.phase != Phase::Rotating {
            return;
        }
        if self.state != EngineState::Monitoring {
            return;
        }
        self.enter_starting();
    }

    fn rotate(&mut self, reason: RotateReason, delay: Duration) {
        if self.state != EngineState::Monitoring {
            return;
        }
        debug!(reason = reason.label(), ?delay, "rotating recognition session");
        if !self.foreground {
            self.dispatcher.debug_notify("rotating listening channel");
        }
        self.status.rotations.fetch_add(1, Ordering::Relaxed);
        self.end_session();
        self.epoch += 1;
        self.phase = Phase::Rotating;
        timer::schedule(
            delay,
            self.tx.clone(),
            EngineEvent::RotateDelayElapsed { epoch: self.epoch },
        );
    }

    fn end_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.end(&self.router);
        }
    }

    // ---- session events ----

    fn on_session_event(&mut self, epoch: u64, event: SessionEvent) {
        if epoch != self.epoch {
            return;
        }
        match event {
            SessionEvent::Transcript { text, .. } => self.on_transcript(&text),
            SessionEvent::Ended(end) => self.on_session_ended(end),
        }
    }

    fn on_transcript(&mut self, text: &str) {
        if self.cfg.log_content {
            debug!(transcript = %text, "partial transcript");
        } else {
            debug!(chars = text.chars().count(), "partial transcript");
        }
        self.publish_transcript(text);
        if !self.foreground && self.cfg.log_content {
            self.dispatcher.debug_notify(&format!("heard: {text}"));
        }

        // Match evaluation and target removal are one step; there is no
        // window where a reported match is still monitored.
        if let Some(station) = self.detector.claim_match(text, &mut self.targets) {
            info!(station = %station.id, "arrival detected");
            self.dispatcher.update_status(&station.name, "arrived");
            self.dispatcher.stop_status(&station.name);
            if let Some(generation) = self.alerts.raise(station.clone(), self.dispatcher.as_ref())
            {
                timer::schedule(
                    Duration::from_millis(self.cfg.alert_auto_dismiss_ms),
                    self.tx.clone(),
                    EngineEvent::AlertExpired {
                        id: station.id.clone(),
                        generation,
                    },
                );
            }
            self.publish_targets();
            self.publish_alerts();
            if self.targets.is_empty() {
                self.stop_listening();
            }
        } else if let Some(sighted) = self.detector.name_sighted(text, &self.targets) {
            let name = sighted.name.clone();
            self.dispatcher
                .update_status(&name, "station name heard, awaiting arrival keyword");
        }
    }

    fn on_session_ended(&mut self, end: SessionEnd) {
        if self.state != EngineState::Monitoring {
            return;
        }
        if let SessionEnd::Failed(code) = end {
            debug!(code, class = ?classify(code), "session failed");
            if classify(code) != ErrorClass::Silence && !self.foreground {
                self.dispatcher
                    .debug_notify(&format!("session reset [{code}]"));
            }
        }
        let delay = rotation_backoff(end, &self.cfg);
        self.rotate(RotateReason::SessionEnded, delay);
    }

    // ---- background survival ----

    fn on_backgrounded(&mut self) {
        if !self.foreground {
            return;
        }
        self.foreground = false;
        debug!("entered background");
        if self.state == EngineState::Monitoring {
            self.heartbeat_frames_seen = self.router.delivered();
            self.survival.engage(
                Duration::from_millis(self.cfg.heartbeat_interval_ms),
                self.tx.clone(),
            );
        }
    }

    fn on_foregrounded(&mut self) {
        if self.foreground {
            return;
        }
        self.foreground = true;
        debug!("entered foreground");
        // Monitoring state itself is unchanged; only the survival machinery
        // stands down.
        self.survival.release();
    }

    fn on_heartbeat(&mut self) {
        if self.state != EngineState::Monitoring {
            return;
        }
        self.dispatcher.debug_notify("background heartbeat");
        // Keep the glanceable surface fresh; start is a no-op if it exists.
        if let Some(first) = self.targets.first() {
            self.dispatcher.start_status(&first.name);
        }
        let delivered = self.router.delivered();
        if delivered == self.heartbeat_frames_seen {
            self.force_capture_restart();
        }
        self.heartbeat_frames_seen = delivered;
    }

    /// The input device silently stopped delivering data without raising an
    /// error. Stop capture and the session, wait briefly for the device to be
    /// released, then re-open both.
    fn force_capture_restart(&mut self) {
        warn!("no audio frames across a heartbeat interval; forcing capture restart");
        self.dispatcher
            .debug_notify("audio pipeline stalled; restarting capture");
        self.status.forced_restarts.fetch_add(1, Ordering::Relaxed);
        self.end_session();
        self.capture.stop();
        self.epoch += 1;
        self.phase = Phase::Rotating;
        timer::schedule(
            Duration::from_millis(self.cfg.capture_restart_delay_ms),
            self.tx.clone(),
            EngineEvent::CaptureRestartDue,
        );
    }

    fn on_capture_restart_due(&mut self) {
        if self.state != EngineState::Monitoring {
            return;
        }
        match self.try_start_capture() {
            Ok(()) => {
                if self.phase != Phase::Active {
                    self.enter_starting();
                }
            }
            Err(CaptureError::PermissionDenied) => {
                // Permission revoked mid-run; nothing left to monitor with.
                self.stop_all();
            }
            Err(CaptureError::Unavailable(_)) => {
                // try_start_capture already paced the next attempt.
            }
        }
    }

    fn on_grant_expiring(&mut self) {
        if self.state != EngineState::Monitoring {
            return;
        }
        self.dispatcher
            .debug_notify("keep-alive grant expiring; rotating session");
        self.rotate(RotateReason::GrantExpiring, Duration::ZERO);
    }

    // ---- status board ----

    fn publish_state(&self) {
        crate::lock_or_recover(&self.status.inner, "status board").state = self.state;
    }

    fn publish_targets(&self) {
        crate::lock_or_recover(&self.status.inner, "status board").targets =
            self.targets.iter().map(|t| t.name.clone()).collect();
    }

    fn publish_transcript(&self, text: &str) {
        crate::lock_or_recover(&self.status.inner, "status board").last_transcript =
            text.to_string();
    }

    fn publish_alerts(&self) {
        crate::lock_or_recover(&self.status.inner, "status board").active_alerts =
            self.alerts.active_names();
    }
}
