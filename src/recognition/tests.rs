use super::service::{SessionEnd, SessionEvent, SessionRequest, SpeechService};
use super::session::{RecognitionSession, SessionSpec};
use crate::audio::{AudioFrame, FrameRouter};
use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Service double that hands the test both ends of the wiring: the frame
/// receiver the session feeds and the event sender the session listens to.
#[derive(Default)]
struct ManualService {
    sessions: Mutex<Vec<ManualSession>>,
}

struct ManualSession {
    frames: Receiver<AudioFrame>,
    events: Sender<SessionEvent>,
}

impl ManualService {
    fn session(&self, index: usize) -> ManualSession {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        assert!(sessions.len() > index, "session {index} was never opened");
        sessions.remove(index)
    }

    fn opened(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl SpeechService for ManualService {
    fn open_session(&self, request: SessionRequest) -> Result<Receiver<SessionEvent>> {
        let (events_tx, events_rx) = unbounded();
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(ManualSession {
                frames: request.frames,
                events: events_tx,
            });
        Ok(events_rx)
    }
}

fn spec() -> SessionSpec {
    SessionSpec {
        locale: "zh-CN".to_string(),
        prefer_on_device: true,
        channel_capacity: 8,
    }
}

fn collector() -> (
    impl Fn(u64, SessionEvent) + Send + 'static,
    Receiver<(u64, SessionEvent)>,
) {
    let (tx, rx) = unbounded();
    (move |epoch, event| {
        let _ = tx.send((epoch, event));
    }, rx)
}

#[test]
fn open_attaches_router_and_feeds_service() {
    let manual = Arc::new(ManualService::default());
    let service: Arc<dyn SpeechService> = manual.clone();
    let router = Arc::new(FrameRouter::new());
    let (deliver, _events) = collector();
    let session = RecognitionSession::open(1, &service, &router, &spec(), deliver)
        .expect("session should open");
    assert_eq!(session.epoch(), 1);
    assert_eq!(manual.opened(), 1);

    let wired = manual.session(0);
    router.deliver(vec![0.5; 16]);
    let frame = wired
        .frames
        .recv_timeout(Duration::from_secs(1))
        .expect("frame should reach the service");
    assert_eq!(frame.len(), 16);
}

#[test]
fn events_are_forwarded_with_the_session_epoch() {
    let manual = Arc::new(ManualService::default());
    let service: Arc<dyn SpeechService> = manual.clone();
    let router = Arc::new(FrameRouter::new());
    let (deliver, events) = collector();
    let _session =
        RecognitionSession::open(7, &service, &router, &spec(), deliver).expect("open");

    let wired = manual.session(0);
    wired
        .events
        .send(SessionEvent::Transcript {
            text: "下一站 国贸".to_string(),
            is_final: false,
        })
        .expect("send transcript");

    let (epoch, event) = events
        .recv_timeout(Duration::from_secs(1))
        .expect("event should be pumped through");
    assert_eq!(epoch, 7);
    assert_eq!(
        event,
        SessionEvent::Transcript {
            text: "下一站 国贸".to_string(),
            is_final: false,
        }
    );
}

#[test]
fn end_detaches_the_router_and_closes_the_frame_channel() {
    let manual = Arc::new(ManualService::default());
    let service: Arc<dyn SpeechService> = manual.clone();
    let router = Arc::new(FrameRouter::new());
    let (deliver, _events) = collector();
    let session = RecognitionSession::open(1, &service, &router, &spec(), deliver).expect("open");

    let wired = manual.session(0);
    session.end(&router);
    // With the sink detached the service side sees a disconnected channel.
    assert!(matches!(
        wired.frames.recv_timeout(Duration::from_secs(1)),
        Err(crossbeam_channel::RecvTimeoutError::Disconnected)
    ));
}

#[test]
fn terminal_events_round_trip() {
    let manual = Arc::new(ManualService::default());
    let service: Arc<dyn SpeechService> = manual.clone();
    let router = Arc::new(FrameRouter::new());
    let (deliver, events) = collector();
    let _session =
        RecognitionSession::open(3, &service, &router, &spec(), deliver).expect("open");

    let wired = manual.session(0);
    wired
        .events
        .send(SessionEvent::Ended(SessionEnd::Failed(super::CODE_NO_SPEECH)))
        .expect("send terminal");

    let (_, event) = events.recv_timeout(Duration::from_secs(1)).expect("event");
    assert_eq!(
        event,
        SessionEvent::Ended(SessionEnd::Failed(super::CODE_NO_SPEECH))
    );
}
