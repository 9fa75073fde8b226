//! Signal conditioning: DC removal → Hamming window → peak normalization →
//! 16-bit quantization.
//!
//! Every stage preserves the sample count.  [`preprocess`] runs all four
//! stages and is applied by the sampler after capture.
//! [`condition_for_model`] first fits the signal to the model's input length
//! and then runs the window and normalization stages, leaving the result as
//! floats in `[-1, 1]` for inference.
//!
//! ```rust
//! use voice_recognition::audio::preprocess;
//!
//! let out = preprocess(&[10, -10, 10, -10]);
//! assert_eq!(out.len(), 4);
//! ```

use std::f32::consts::PI;

use super::buffer::AudioSample;

/// Full-scale value used by quantization.
pub const QUANT_SCALE: f32 = 32_767.0;

/// Run all four stages over raw samples.
pub fn preprocess(samples: &[AudioSample]) -> Vec<AudioSample> {
    if samples.is_empty() {
        return Vec::new();
    }

    let mut signal: Vec<f32> = samples.iter().map(|&s| f32::from(s)).collect();
    remove_dc(&mut signal);
    apply_hamming(&mut signal);
    normalize(&mut signal);
    quantize(&signal)
}

/// Truncate or zero-pad to `required_len`, then window and normalize.
pub fn condition_for_model(samples: &[AudioSample], required_len: usize) -> Vec<f32> {
    let mut signal: Vec<f32> = samples
        .iter()
        .take(required_len)
        .map(|&s| f32::from(s))
        .collect();
    signal.resize(required_len, 0.0);

    apply_hamming(&mut signal);
    normalize(&mut signal);
    signal
}

/// Subtract the arithmetic mean from every sample.
pub fn remove_dc(signal: &mut [f32]) {
    if signal.is_empty() {
        return;
    }
    // Accumulate in f64: 240 000 samples near full scale lose precision in f32.
    let mean = signal.iter().map(|&v| f64::from(v)).sum::<f64>() / signal.len() as f64;
    let mean = mean as f32;
    for v in signal.iter_mut() {
        *v -= mean;
    }
}

/// Hamming coefficient for sample `i` of `n`.
///
/// For `n <= 1` the window is undefined; the coefficient is `1.0`.
pub fn hamming(i: usize, n: usize) -> f32 {
    if n <= 1 {
        return 1.0;
    }
    0.54 - 0.46 * (2.0 * PI * i as f32 / (n - 1) as f32).cos()
}

pub fn apply_hamming(signal: &mut [f32]) {
    let n = signal.len();
    for (i, v) in signal.iter_mut().enumerate() {
        *v *= hamming(i, n);
    }
}

/// Divide by the peak absolute value.  Silence is left untouched.
pub fn normalize(signal: &mut [f32]) {
    let peak = signal.iter().fold(0.0_f32, |acc, v| acc.max(v.abs()));
    if peak == 0.0 {
        return;
    }
    for v in signal.iter_mut() {
        *v /= peak;
    }
}

/// Map `[-1, 1]` to `i16` via `floor(v × 32767)`.
pub fn quantize(signal: &[f32]) -> Vec<AudioSample> {
    // `as` saturates at the i16 bounds.
    signal
        .iter()
        .map(|&v| (v * QUANT_SCALE).floor() as AudioSample)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
