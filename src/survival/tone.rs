//! Near-silent keep-alive tone.
//!
//! Continuous audio output is the platform's signal that the process is
//! doing audio work and should keep running with the screen off. The tone is
//! a low-frequency sine at a level just above true digital silence — quiet
//! enough to be inaudible, loud enough that the output path stays active.

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use crossbeam_channel::{bounded, Sender};
use std::f32::consts::TAU;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

const TONE_HZ: f32 = 110.0;
const TONE_AMPLITUDE: f32 = 0.002;

/// Handle to the running tone. Dropping it stops playback and releases the
/// output device.
pub struct KeepAliveTone {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl KeepAliveTone {
    /// Open the default output device and start looping the tone. The CPAL
    /// stream is not `Send`, so it lives on its own parked thread.
    pub fn start() -> Result<Self> {
        let (ready_tx, ready_rx) = bounded::<Result<()>>(1);
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let handle = thread::spawn(move || {
            let stream = match open_output_stream() {
                Ok(stream) => stream,
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                    return;
                }
            };
            if let Err(err) = stream.play() {
                let _ = ready_tx.send(Err(anyhow!("failed to start tone stream: {err}")));
                return;
            }
            let _ = ready_tx.send(Ok(()));
            let _ = stop_rx.recv();
            drop(stream);
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {
                debug!("keep-alive tone playing");
                Ok(Self {
                    stop_tx,
                    handle: Some(handle),
                })
            }
            Ok(Err(err)) => {
                let _ = handle.join();
                Err(err)
            }
            Err(_) => {
                let _ = handle.join();
                Err(anyhow!("tone thread exited before opening the device"))
            }
        }
    }
}

impl Drop for KeepAliveTone {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("keep-alive tone thread panicked during shutdown");
            }
        }
    }
}

fn open_output_stream() -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("no default output device available")?;
    let default_config = device
        .default_output_config()
        .context("failed to query output config")?;
    let format = default_config.sample_format();
    let config: StreamConfig = default_config.into();
    let sample_rate = config.sample_rate.0 as f32;
    let channels = usize::from(config.channels.max(1));

    let err_fn = |err| warn!("tone stream error: {err}");
    let mut phase = 0.0f32;
    let step = TAU * TONE_HZ / sample_rate;

    let stream = match format {
        SampleFormat::F32 => device.build_output_stream(
            &config,
            move |data: &mut [f32], _| {
                for frame in data.chunks_mut(channels) {
                    let sample = phase.sin() * TONE_AMPLITUDE;
                    phase = (phase + step) % TAU;
                    for out in frame {
                        *out = sample;
                    }
                }
            },
            err_fn,
            None,
        ),
        SampleFormat::I16 => device.build_output_stream(
            &config,
            move |data: &mut [i16], _| {
                for frame in data.chunks_mut(channels) {
                    let sample = (phase.sin() * TONE_AMPLITUDE * 32_767.0) as i16;
                    phase = (phase + step) % TAU;
                    for out in frame {
                        *out = sample;
                    }
                }
            },
            err_fn,
            None,
        ),
        other => return Err(anyhow!("unsupported output sample format: {other:?}")),
    };

    stream.context("failed to open output stream")
}
