//! Background survival: keeping the process alive and the pipeline honest
//! while the host would rather suspend it.
//!
//! Platform keep-alive tricks differ (silent audio loops, extended-execution
//! grants, passive location wakeups), so they hide behind the
//! [`SurvivalStrategy`] capability. The controller owns the strategy plus the
//! heartbeat timer; the heartbeat itself only sends ticks — the engine reads
//! the frame counter and decides whether the pipeline stalled.

mod tone;

use crate::engine::EngineEvent;
use crate::timer::RepeatingTimer;
use anyhow::Result;
use crossbeam_channel::Sender;
use std::time::Duration;
use tracing::{debug, warn};

pub use tone::KeepAliveTone;

/// Liveness callback handed to a strategy. The only thing a strategy may do
/// with engine state is send events through it.
#[derive(Clone)]
pub struct SurvivalEvents {
    events: Sender<EngineEvent>,
}

impl SurvivalEvents {
    pub fn new(events: Sender<EngineEvent>) -> Self {
        Self { events }
    }

    /// Signal that the platform's extended-execution grant is about to
    /// expire. The engine rotates the recognition session before the hard
    /// deadline.
    pub fn grant_expiring(&self) {
        let _ = self.events.send(EngineEvent::GrantExpiring);
    }
}

/// Platform keep-alive binding. `engage` is called when monitoring goes into
/// the background, `release` on foregrounding or stop; both are idempotent
/// from the controller's side.
pub trait SurvivalStrategy: Send {
    fn engage(&mut self, liveness: SurvivalEvents) -> Result<()>;
    fn release(&mut self);
}

/// Desktop binding: a near-silent output tone keeps the audio subsystem
/// active. No execution grant exists on desktop, so the liveness callback
/// never fires here.
pub struct DesktopSurvival {
    tone_enabled: bool,
    tone: Option<KeepAliveTone>,
}

impl DesktopSurvival {
    pub fn new(tone_enabled: bool) -> Self {
        Self {
            tone_enabled,
            tone: None,
        }
    }
}

impl SurvivalStrategy for DesktopSurvival {
    fn engage(&mut self, _liveness: SurvivalEvents) -> Result<()> {
        if self.tone_enabled && self.tone.is_none() {
            match KeepAliveTone::start() {
                Ok(tone) => self.tone = Some(tone),
                // A missing output device must not take monitoring down.
                Err(err) => warn!("keep-alive tone unavailable: {err:#}"),
            }
        }
        Ok(())
    }

    fn release(&mut self) {
        self.tone = None;
    }
}

/// No-op strategy for foreground-only runs.
#[derive(Default)]
pub struct NullSurvival;

impl SurvivalStrategy for NullSurvival {
    fn engage(&mut self, _liveness: SurvivalEvents) -> Result<()> {
        Ok(())
    }

    fn release(&mut self) {}
}

/// Owns the strategy and the heartbeat for the engine. Engaged while the
/// engine is monitoring in the background, released on foregrounding or stop.
pub struct SurvivalController {
    strategy: Box<dyn SurvivalStrategy>,
    heartbeat: Option<RepeatingTimer>,
    engaged: bool,
}

impl SurvivalController {
    pub fn new(strategy: Box<dyn SurvivalStrategy>) -> Self {
        Self {
            strategy,
            heartbeat: None,
            engaged: false,
        }
    }

    pub fn engage(&mut self, heartbeat_interval: Duration, events: Sender<EngineEvent>) {
        if self.engaged {
            return;
        }
        debug!("engaging background survival");
        if let Err(err) = self.strategy.engage(SurvivalEvents::new(events.clone())) {
            warn!("survival strategy failed to engage: {err:#}");
        }
        self.heartbeat = Some(RepeatingTimer::spawn(heartbeat_interval, events, || {
            EngineEvent::HeartbeatTick
        }));
        self.engaged = true;
    }

    pub fn release(&mut self) {
        if !self.engaged {
            return;
        }
        debug!("releasing background survival");
        self.heartbeat = None;
        self.strategy.release();
        self.engaged = false;
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged
    }
}
