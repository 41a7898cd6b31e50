use super::resample::resample_to_target_rate;
use super::{AudioFrame, FrameRouter, TARGET_RATE};
use std::sync::Arc;

/// Downmix multi-channel input to mono while applying the provided converter
/// so the recognizer receives a single channel regardless of the microphone
/// layout.
pub(super) fn append_downmixed_samples<T, F>(
    buf: &mut Vec<f32>,
    data: &[T],
    channels: usize,
    mut convert: F,
) where
    T: Copy,
    F: FnMut(T) -> f32,
{
    if channels <= 1 {
        buf.extend(data.iter().copied().map(&mut convert));
        return;
    }

    // Average each interleaved frame to produce a mono representation.
    let mut acc = 0.0f32;
    let mut count = 0usize;
    for sample in data.iter().copied() {
        acc += convert(sample);
        count += 1;
        if count == channels {
            buf.push(acc / channels as f32);
            acc = 0.0;
            count = 0;
        }
    }
    if count > 0 {
        buf.push(acc / count as f32);
    }
}

/// Accumulates device-rate mono samples, resamples to the target rate, and
/// pushes fixed-size frames into the router. Lives on the audio callback
/// thread for the lifetime of one capture stream.
pub(super) struct FramePump {
    device_rate: u32,
    frame_samples: usize,
    mono: Vec<f32>,
    pending: Vec<f32>,
    router: Arc<FrameRouter>,
}

impl FramePump {
    pub(super) fn new(device_rate: u32, frame_samples: usize, router: Arc<FrameRouter>) -> Self {
        Self {
            device_rate,
            frame_samples: frame_samples.max(1),
            mono: Vec::new(),
            pending: Vec::with_capacity(frame_samples * 2),
            router,
        }
    }

    pub(super) fn push<T, F>(&mut self, data: &[T], channels: usize, convert: F)
    where
        T: Copy,
        F: FnMut(T) -> f32,
    {
        self.mono.clear();
        append_downmixed_samples(&mut self.mono, data, channels, convert);

        if self.device_rate == TARGET_RATE {
            self.pending.extend_from_slice(&self.mono);
        } else {
            let resampled = resample_to_target_rate(&self.mono, self.device_rate);
            self.pending.extend_from_slice(&resampled);
        }

        while self.pending.len() >= self.frame_samples {
            let frame: AudioFrame = self.pending.drain(..self.frame_samples).collect();
            self.router.deliver(frame);
        }
    }
}
