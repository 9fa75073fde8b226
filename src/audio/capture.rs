//! Microphone sound-level source via `cpal`.
//!
//! The cpal callback runs on its own audio thread and only publishes the
//! peak level of the latest hardware buffer into an atomic.  The sampler
//! reads that value once per tick through [`SoundLevelSource`], so the
//! pipeline itself stays on a single execution context.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use super::source::SoundLevelSource;

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while opening the microphone.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

// ---------------------------------------------------------------------------
// MicLevelSource
// ---------------------------------------------------------------------------

/// Sound level of the default input device, on the `0..=255` scale.
///
/// Dropping the value stops the underlying cpal stream.
pub struct MicLevelSource {
    level: Arc<AtomicU8>,
    device_rate: u32,
    _stream: cpal::Stream,
}

impl MicLevelSource {
    /// Open the system default input device and start streaming.
    pub fn open() -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(CaptureError::NoDevice)?;

        let supported = device.default_input_config()?;
        let device_rate = supported.sample_rate().0;
        let config: cpal::StreamConfig = supported.into();

        let level = Arc::new(AtomicU8::new(0));
        let writer = Arc::clone(&level);

        let stream = device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                writer.store(peak_level(data), Ordering::Relaxed);
            },
            |err: cpal::StreamError| {
                log::error!("cpal stream error: {err}");
            },
            None,
        )?;

        stream.play()?;
        Ok(Self {
            level,
            device_rate,
            _stream: stream,
        })
    }

    /// Native rate of the device stream (informational only).
    pub fn device_rate(&self) -> u32 {
        self.device_rate
    }
}

impl SoundLevelSource for MicLevelSource {
    fn sound_level(&mut self) -> u8 {
        self.level.load(Ordering::Relaxed)
    }
}

/// Peak absolute amplitude of `data` mapped to `0..=255`.
fn peak_level(data: &[f32]) -> u8 {
    let peak = data.iter().fold(0.0_f32, |acc, s| acc.max(s.abs())).min(1.0);
    (peak * 255.0).round() as u8
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_level_scales_and_clamps() {
        assert_eq!(peak_level(&[]), 0);
        assert_eq!(peak_level(&[0.0, -0.5, 0.25]), 128);
        assert_eq!(peak_level(&[1.5]), 255);
    }
}
