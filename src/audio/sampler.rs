//! Periodic audio acquisition.
//!
//! [`Sampler`] is a synchronous state machine; [`drive`] is the timer loop
//! that feeds it one tick at a time from a `tokio::time::interval`.
//!
//! ```text
//! Idle ──start()──▶ Recording ──elapsed ≥ duration
//!                              │  or count ≥ needed
//!                              │  or stop()────────────▶ Completed ──start()/clear──▶ …
//! ```
//!
//! Every tick while recording reads one level from the
//! [`SoundLevelSource`], turns it into a signed sample and appends it.  On
//! completion the buffer is padded back to `samples_needed` (unless the
//! recording was stopped) and run through [`preprocess`] in place.
//!
//! `drive` awaits the interval exactly once per loop iteration and the tick
//! handler never awaits, so on a current-thread runtime no other pipeline
//! code runs while a tick is in progress.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::buffer::{AudioBuffer, AudioSample};
use super::preprocess::preprocess;
use super::source::{synthesize_sample, GainTier, SoundLevelSource};

pub const MIN_SAMPLE_RATE: u32 = 8_000;
pub const MAX_SAMPLE_RATE: u32 = 48_000;
pub const MIN_DURATION_MS: u32 = 100;
pub const MAX_DURATION_MS: u32 = 5_000;

pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;
pub const DEFAULT_DURATION_MS: u32 = 1_000;

/// `floor(sample_rate × duration_ms / 1000)`.
pub fn samples_needed(sample_rate: u32, duration_ms: u32) -> usize {
    (u64::from(sample_rate) * u64::from(duration_ms) / 1_000) as usize
}

/// `max(1, floor(1000 / sample_rate))` milliseconds.
pub fn tick_interval(sample_rate: u32) -> Duration {
    let ms = if sample_rate == 0 { 1 } else { 1_000 / sample_rate };
    Duration::from_millis(u64::from(ms.max(1)))
}

// ---------------------------------------------------------------------------
// StopHandle
// ---------------------------------------------------------------------------

/// Cooperative cancellation flag, checked at the next tick boundary.
///
/// Cheap to clone; every clone refers to the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Request that the current recording ends on its next tick.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Session / completion types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    Idle,
    Recording,
    Completed,
}

/// Transient state of an in-progress recording.
#[derive(Debug, Clone)]
pub struct RecordingSession {
    pub started_at: Instant,
    pub elapsed_samples: usize,
    pub samples_needed: usize,
    /// Duration snapshot taken at `start()`.
    pub duration: Duration,
}

/// Which condition ended a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Wall-clock duration elapsed (the normal case).
    Duration,
    /// Sample-count backstop reached before the clock.
    SampleCount,
    /// `stop()` was requested; the buffer is not padded.
    Stopped,
}

/// Summary handed back when a recording completes.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub reason: StopReason,
    /// Samples actually acquired from the source.
    pub captured: usize,
    /// Samples added by padding.
    pub padded: usize,
    /// Final buffer length after padding.
    pub len: usize,
}

/// Result of a single [`Sampler::tick`].
#[derive(Debug, Clone, PartialEq)]
pub enum Tick {
    /// Not recording; nothing happened.
    Idle,
    /// One sample was appended.
    Sampled,
    /// The recording finished on this tick.
    Completed(Completion),
}

// ---------------------------------------------------------------------------
// Sampler
// ---------------------------------------------------------------------------

/// Drives acquisition from a [`SoundLevelSource`] into a bounded buffer.
pub struct Sampler<S> {
    source: S,
    sample_rate: u32,
    duration_ms: u32,
    gain: GainTier,
    buffer: AudioBuffer,
    session: Option<RecordingSession>,
    state: SamplerState,
    stop: StopHandle,
    rng: StdRng,
}

impl<S: SoundLevelSource> Sampler<S> {
    pub fn new(source: S) -> Self {
        Self::with_rng(source, StdRng::from_entropy())
    }

    /// Use a fixed RNG for the dither noise (reproducible captures).
    pub fn with_rng(source: S, rng: StdRng) -> Self {
        Self {
            source,
            sample_rate: DEFAULT_SAMPLE_RATE,
            duration_ms: DEFAULT_DURATION_MS,
            gain: GainTier::for_sample_rate(DEFAULT_SAMPLE_RATE),
            buffer: AudioBuffer::default(),
            session: None,
            state: SamplerState::Idle,
            stop: StopHandle::default(),
            rng,
        }
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    /// Set the sample rate.  Values outside `[8000, 48000]` are ignored.
    ///
    /// Also selects the gain tier.  Returns whether the value was applied.
    pub fn set_sample_rate(&mut self, rate: u32) -> bool {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&rate) {
            log::debug!("sampler: ignoring sample rate {rate} Hz");
            return false;
        }
        self.sample_rate = rate;
        self.gain = GainTier::for_sample_rate(rate);
        true
    }

    /// Set the recording duration.  Values outside `[100, 5000]` ms are
    /// ignored.  Returns whether the value was applied.
    pub fn set_duration_ms(&mut self, duration_ms: u32) -> bool {
        if !(MIN_DURATION_MS..=MAX_DURATION_MS).contains(&duration_ms) {
            log::debug!("sampler: ignoring duration {duration_ms} ms");
            return false;
        }
        self.duration_ms = duration_ms;
        true
    }

    pub fn configure(&mut self, sample_rate: u32, duration_ms: u32) {
        self.set_sample_rate(sample_rate);
        self.set_duration_ms(duration_ms);
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_ms(&self) -> u32 {
        self.duration_ms
    }

    pub fn gain_tier(&self) -> GainTier {
        self.gain
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Begin a recording now.  No-op (returns `false`) if already recording.
    pub fn start(&mut self) -> bool {
        self.start_at(Instant::now())
    }

    /// Begin a recording with an explicit start timestamp.
    pub fn start_at(&mut self, now: Instant) -> bool {
        if self.is_recording() {
            log::debug!("sampler: start ignored, already recording");
            return false;
        }

        let needed = samples_needed(self.sample_rate, self.duration_ms);
        self.buffer.reset(needed);
        self.stop.reset();
        self.session = Some(RecordingSession {
            started_at: now,
            elapsed_samples: 0,
            samples_needed: needed,
            duration: Duration::from_millis(u64::from(self.duration_ms)),
        });
        self.state = SamplerState::Recording;

        log::debug!(
            "sampler: recording {} ms @ {} Hz ({needed} samples, tick {:?})",
            self.duration_ms,
            self.sample_rate,
            self.tick_interval()
        );
        true
    }

    /// Request an early stop, observed on the next tick.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// A handle that can request a stop without borrowing the sampler.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn tick_interval(&self) -> Duration {
        tick_interval(self.sample_rate)
    }

    /// Run one acquisition step at time `now`.
    pub fn tick(&mut self, now: Instant) -> Tick {
        let (started_at, duration, elapsed_samples, needed) = match &self.session {
            Some(s) => (s.started_at, s.duration, s.elapsed_samples, s.samples_needed),
            None => return Tick::Idle,
        };

        let reason = if self.stop.take() {
            Some(StopReason::Stopped)
        } else if now.saturating_duration_since(started_at) >= duration {
            Some(StopReason::Duration)
        } else if elapsed_samples >= needed {
            Some(StopReason::SampleCount)
        } else {
            None
        };

        if let Some(reason) = reason {
            return Tick::Completed(self.complete(reason));
        }

        let level = self.source.sound_level();
        let sample = synthesize_sample(level, self.gain, &mut self.rng);
        self.buffer.push(sample);
        if let Some(session) = self.session.as_mut() {
            session.elapsed_samples += 1;
        }
        Tick::Sampled
    }

    fn complete(&mut self, reason: StopReason) -> Completion {
        self.session = None;
        let captured = self.buffer.len();

        let padded = match reason {
            StopReason::Stopped => 0,
            StopReason::Duration | StopReason::SampleCount => self.buffer.pad_to_capacity(),
        };

        if !self.buffer.is_empty() {
            let processed = preprocess(self.buffer.as_slice());
            self.buffer.replace(processed);
        }

        self.state = SamplerState::Completed;
        log::debug!(
            "sampler: completed ({reason:?}), captured {captured}, padded {padded}"
        );

        Completion {
            reason,
            captured,
            padded,
            len: self.buffer.len(),
        }
    }

    // -----------------------------------------------------------------------
    // State / data access
    // -----------------------------------------------------------------------

    pub fn is_recording(&self) -> bool {
        self.state == SamplerState::Recording
    }

    pub fn state(&self) -> SamplerState {
        self.state
    }

    pub fn session(&self) -> Option<&RecordingSession> {
        self.session.as_ref()
    }

    /// The captured (and, once completed, preprocessed) samples.
    pub fn audio_data(&self) -> &[AudioSample] {
        self.buffer.as_slice()
    }

    /// Drop the captured samples.  Ignored while recording.
    pub fn clear_audio_buffer(&mut self) {
        if self.is_recording() {
            return;
        }
        self.buffer.clear();
        self.state = SamplerState::Idle;
    }
}

// ---------------------------------------------------------------------------
// Timer loop
// ---------------------------------------------------------------------------

/// Tick `sampler` on its interval until the current recording completes.
///
/// Returns `None` immediately when the sampler is not recording.
pub async fn drive<S: SoundLevelSource>(sampler: &mut Sampler<S>) -> Option<Completion> {
    if !sampler.is_recording() {
        return None;
    }

    let mut ticker = time::interval(sampler.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match sampler.tick(Instant::now()) {
            Tick::Sampled => {}
            Tick::Completed(completion) => return Some(completion),
            Tick::Idle => return None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
