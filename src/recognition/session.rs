use super::service::{SessionEvent, SessionRequest, SpeechService};
use crate::audio::FrameRouter;
use anyhow::Result;
use crossbeam_channel::bounded;
use std::sync::Arc;
use std::thread;
use tracing::debug;

/// Parameters the scheduler carries from config to each new session.
#[derive(Debug, Clone)]
pub struct SessionSpec {
    pub locale: String,
    pub prefer_on_device: bool,
    pub channel_capacity: usize,
}

/// One bounded-lifetime recognition attempt, engine side.
///
/// Opening a session wires three things together: a fresh frame channel
/// registered with the router, the service's event stream, and a pump thread
/// that forwards every event tagged with this session's epoch. The epoch tag
/// is what lets the engine drop events from a session it already tore down.
///
/// Sessions are single-use. `end` detaches the router sink, which closes the
/// frame channel and lets the service wind the session down; the pump exits
/// when the service drops its event sender.
pub struct RecognitionSession {
    epoch: u64,
}

impl RecognitionSession {
    pub fn open<F>(
        epoch: u64,
        service: &Arc<dyn SpeechService>,
        router: &Arc<FrameRouter>,
        spec: &SessionSpec,
        deliver: F,
    ) -> Result<Self>
    where
        F: Fn(u64, SessionEvent) + Send + 'static,
    {
        let (frame_tx, frame_rx) = bounded(spec.channel_capacity.max(1));
        let events = service.open_session(SessionRequest {
            locale: spec.locale.clone(),
            prefer_on_device: spec.prefer_on_device,
            frames: frame_rx,
        })?;
        // Only attach once the service accepted the session, so a failed open
        // leaves the router untouched.
        router.attach(frame_tx);
        debug!(epoch, "recognition session opened");

        thread::spawn(move || {
            for event in events {
                deliver(epoch, event);
            }
        });

        Ok(Self { epoch })
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Tear the session down. Idempotent at the engine level: the router only
    /// holds one sink, and a second detach is a no-op.
    pub fn end(&self, router: &FrameRouter) {
        router.detach();
        debug!(epoch = self.epoch, "recognition session ended");
    }
}
