//! Hardware sound-level source and the raw-sample synthesis step.
//!
//! The capture hardware does not deliver PCM; it reports an unsigned level in
//! `[0, 255]` once per tick.  [`synthesize_sample`] turns that level into a
//! signed 16-bit sample: scale by the [`GainTier`], shift into the signed
//! domain, add a little dither and clamp.

use rand::Rng;

use super::buffer::AudioSample;

/// Peak-to-peak amplitude of the dither noise added to every sample.
pub const DITHER_AMPLITUDE: i32 = 50;

// ---------------------------------------------------------------------------
// SoundLevelSource
// ---------------------------------------------------------------------------

/// Anything that can report the current sound level.
///
/// Called exactly once per sampler tick.
pub trait SoundLevelSource {
    /// Current level in `[0, 255]`.
    fn sound_level(&mut self) -> u8;
}

impl<S: SoundLevelSource + ?Sized> SoundLevelSource for Box<S> {
    fn sound_level(&mut self) -> u8 {
        (**self).sound_level()
    }
}

// ---------------------------------------------------------------------------
// GainTier
// ---------------------------------------------------------------------------

/// Microphone gain band selected from the configured sample rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GainTier {
    /// Rates up to 11 kHz.
    Low,
    /// Rates up to 22 kHz.
    Mid,
    /// Everything above.
    High,
}

impl GainTier {
    pub fn for_sample_rate(rate: u32) -> Self {
        if rate <= 11_000 {
            GainTier::Low
        } else if rate <= 22_000 {
            GainTier::Mid
        } else {
            GainTier::High
        }
    }

    /// Gain factor on the `0..=255` scale.
    pub fn gain(self) -> i32 {
        match self {
            GainTier::Low => 64,
            GainTier::Mid => 128,
            GainTier::High => 192,
        }
    }
}

impl Default for GainTier {
    fn default() -> Self {
        GainTier::Mid
    }
}

/// Convert one raw `level` reading into a signed sample.
pub fn synthesize_sample<R: Rng + ?Sized>(level: u8, gain: GainTier, rng: &mut R) -> AudioSample {
    let amplified = i32::from(level) * gain.gain() / 255;
    let centered = (amplified - 128) * 256;
    let noise = rng.gen_range(-DITHER_AMPLITUDE..=DITHER_AMPLITUDE);
    (centered + noise).clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as AudioSample
}

// ---------------------------------------------------------------------------
// SyntheticLevelSource
// ---------------------------------------------------------------------------

/// Stand-in source producing random levels around a base value.
///
/// Used by the CLI when no microphone is available.
pub struct SyntheticLevelSource<R> {
    rng: R,
    base: u8,
    spread: u8,
}

impl<R: Rng> SyntheticLevelSource<R> {
    pub fn new(rng: R, base: u8, spread: u8) -> Self {
        Self { rng, base, spread }
    }
}

impl<R: Rng> SoundLevelSource for SyntheticLevelSource<R> {
    fn sound_level(&mut self) -> u8 {
        let lo = self.base.saturating_sub(self.spread);
        let hi = self.base.saturating_add(self.spread);
        self.rng.gen_range(lo..=hi)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
