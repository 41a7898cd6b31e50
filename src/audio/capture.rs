//! System microphone capture via CPAL.
//!
//! CPAL streams are not `Send`, so the stream lives on a dedicated capture
//! thread that parks until stopped. The [`AudioCapture`] handle owns only the
//! control channel, which keeps start/stop callable from any thread and the
//! handle movable into the engine.

use super::dispatch::FramePump;
use super::FrameRouter;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use crossbeam_channel::{bounded, Sender};
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Why capture could not start. Recoverable availability problems are retried
/// by the survival heartbeat; a permission refusal is fatal to monitoring.
#[derive(Debug)]
pub enum CaptureError {
    PermissionDenied,
    Unavailable(String),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::PermissionDenied => write!(f, "microphone permission denied"),
            CaptureError::Unavailable(reason) => write!(f, "capture unavailable: {reason}"),
        }
    }
}

impl std::error::Error for CaptureError {}

/// Owner of the microphone input stream. At most one stream exists per
/// handle; both calls are idempotent.
pub trait AudioCapture: Send {
    fn start(&mut self, router: Arc<FrameRouter>) -> Result<(), CaptureError>;
    fn stop(&mut self);
}

/// List microphone names so the CLI can expose a human-friendly selector.
pub fn list_input_devices() -> Result<Vec<String>, CaptureError> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|err| CaptureError::Unavailable(format!("no input devices available: {err}")))?;
    let mut names = Vec::new();
    for device in devices {
        if let Ok(name) = device.name() {
            names.push(name);
        }
    }
    Ok(names)
}

pub struct CpalCapture {
    preferred_device: Option<String>,
    frame_samples: usize,
    worker: Option<CaptureWorker>,
}

struct CaptureWorker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

impl CpalCapture {
    pub fn new(preferred_device: Option<String>, frame_samples: usize) -> Self {
        Self {
            preferred_device,
            frame_samples: frame_samples.max(1),
            worker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }
}

impl AudioCapture for CpalCapture {
    fn start(&mut self, router: Arc<FrameRouter>) -> Result<(), CaptureError> {
        if self.worker.is_some() {
            return Ok(());
        }

        let (ready_tx, ready_rx) = bounded::<Result<(), CaptureError>>(1);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let preferred = self.preferred_device.clone();
        let frame_samples = self.frame_samples;

        let handle = thread::spawn(move || {
            let stream = match open_input_stream(preferred.as_deref(), frame_samples, router) {
                Ok(stream) => stream,
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                    return;
                }
            };
            if let Err(err) = stream.play() {
                let _ = ready_tx.send(Err(CaptureError::Unavailable(format!(
                    "failed to start input stream: {err}"
                ))));
                return;
            }
            let _ = ready_tx.send(Ok(()));
            // Park until stop; frames flow on the CPAL callback thread.
            let _ = stop_rx.recv();
            drop(stream);
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.worker = Some(CaptureWorker { stop_tx, handle });
                Ok(())
            }
            Ok(Err(err)) => {
                let _ = handle.join();
                Err(err)
            }
            Err(_) => {
                let _ = handle.join();
                Err(CaptureError::Unavailable(
                    "capture thread exited before opening the device".to_string(),
                ))
            }
        }
    }

    fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            if worker.handle.join().is_err() {
                warn!("capture thread panicked during shutdown");
            }
        }
    }
}

impl Drop for CpalCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

fn open_input_stream(
    preferred: Option<&str>,
    frame_samples: usize,
    router: Arc<FrameRouter>,
) -> Result<cpal::Stream, CaptureError> {
    let host = cpal::default_host();
    let device = match preferred {
        Some(name) => {
            let mut devices = host.input_devices().map_err(|err| {
                CaptureError::Unavailable(format!("no input devices available: {err}"))
            })?;
            devices
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| {
                    CaptureError::Unavailable(format!("input device '{name}' not found"))
                })?
        }
        None => host.default_input_device().ok_or_else(|| {
            CaptureError::Unavailable("no default input device available".to_string())
        })?,
    };

    let default_config = device.default_input_config().map_err(|err| {
        CaptureError::Unavailable(format!("failed to query input config: {err}"))
    })?;
    let format = default_config.sample_format();
    let config: StreamConfig = default_config.into();
    let device_rate = config.sample_rate.0;
    let channels = usize::from(config.channels.max(1));

    debug!(
        ?format,
        device_rate, channels, "opening continuous capture stream"
    );

    let err_fn = |err| warn!("audio stream error: {err}");

    // Convert every supported sample type to f32 up front so the rest of the
    // pipeline stays format-agnostic.
    let stream = match format {
        SampleFormat::F32 => {
            let mut pump = FramePump::new(device_rate, frame_samples, router);
            device.build_input_stream(
                &config,
                move |data: &[f32], _| pump.push(data, channels, |sample| sample),
                err_fn,
                None,
            )
        }
        SampleFormat::I16 => {
            let mut pump = FramePump::new(device_rate, frame_samples, router);
            device.build_input_stream(
                &config,
                move |data: &[i16], _| {
                    pump.push(data, channels, |sample| sample as f32 / 32_768.0)
                },
                err_fn,
                None,
            )
        }
        SampleFormat::U16 => {
            let mut pump = FramePump::new(device_rate, frame_samples, router);
            device.build_input_stream(
                &config,
                move |data: &[u16], _| {
                    pump.push(data, channels, |sample| {
                        (sample as f32 - 32_768.0) / 32_768.0
                    })
                },
                err_fn,
                None,
            )
        }
        other => {
            return Err(CaptureError::Unavailable(format!(
                "unsupported sample format: {other:?}"
            )))
        }
    };

    stream.map_err(|err| CaptureError::Unavailable(format!("failed to open input stream: {err}")))
}
