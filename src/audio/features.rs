//! Framed time-domain features.
//!
//! The signal is cut into 50 %-overlapping frames of at most 256 samples;
//! each frame yields three scalars, appended in this order:
//!
//! 1. **energy**: RMS of the frame
//! 2. **zero-crossing rate**: fraction of adjacent pairs whose sign differs
//!    (`0` counts as non-negative)
//! 3. **centroid**: magnitude-weighted mean index divided by the frame
//!    length.  A time-domain stand-in, not a spectral measure.
//!
//! The per-signal helpers ([`energy`], [`zero_crossing_rate`],
//! [`spectral_centroid`]) are shared with the heuristic classifier, which
//! applies them to the whole signal instead of per frame.

/// Upper bound on the frame size.
pub const MAX_FRAME_SIZE: usize = 256;

/// Number of features emitted per frame.
pub const FEATURES_PER_FRAME: usize = 3;

// ---------------------------------------------------------------------------
// FrameLayout
// ---------------------------------------------------------------------------

/// Frame geometry derived from the signal length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub frame_size: usize,
    pub hop: usize,
    pub num_frames: usize,
}

impl FrameLayout {
    /// `frame_size = min(256, len / 4)`, `hop = frame_size / 2`,
    /// `num_frames = max(1, (len − frame_size) / hop + 1)`.
    ///
    /// Frame size and hop are both floored at 1 so very short signals still
    /// produce a valid layout.
    pub fn for_len(len: usize) -> Self {
        let frame_size = (len / 4).min(MAX_FRAME_SIZE).max(1);
        let hop = (frame_size / 2).max(1);
        let num_frames = (len.saturating_sub(frame_size) / hop + 1).max(1);
        Self {
            frame_size,
            hop,
            num_frames,
        }
    }
}

// ---------------------------------------------------------------------------
// FrameFeatures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameFeatures {
    pub energy: f32,
    pub zcr: f32,
    pub centroid: f32,
}

impl FrameFeatures {
    pub fn of(frame: &[f32]) -> Self {
        Self {
            energy: energy(frame),
            zcr: zero_crossing_rate(frame),
            centroid: spectral_centroid(frame),
        }
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Per-frame features.  Empty input yields no frames.
pub fn extract_frames<T: Copy + Into<f32>>(signal: &[T]) -> Vec<FrameFeatures> {
    if signal.is_empty() {
        return Vec::new();
    }

    let layout = FrameLayout::for_len(signal.len());
    let mut frame = vec![0.0_f32; layout.frame_size];

    (0..layout.num_frames)
        .map(|index| {
            let start = index * layout.hop;
            for (offset, slot) in frame.iter_mut().enumerate() {
                // zero-pad past the end of the signal
                *slot = signal.get(start + offset).map_or(0.0, |&v| v.into());
            }
            FrameFeatures::of(&frame)
        })
        .collect()
}

/// Flat feature vector `[energy, zcr, centroid, energy, …]` of length
/// `3 × num_frames`.
pub fn extract<T: Copy + Into<f32>>(signal: &[T]) -> Vec<f32> {
    extract_frames(signal)
        .into_iter()
        .flat_map(|f| [f.energy, f.zcr, f.centroid])
        .collect()
}

/// Root-mean-square amplitude.
pub fn energy(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    let sum: f64 = signal.iter().map(|&v| f64::from(v) * f64::from(v)).sum();
    (sum / signal.len() as f64).sqrt() as f32
}

/// Fraction of adjacent sample pairs with differing sign.
pub fn zero_crossing_rate(signal: &[f32]) -> f32 {
    if signal.len() <= 1 {
        return 0.0;
    }
    let crossings = signal
        .windows(2)
        .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
        .count();
    crossings as f32 / (signal.len() - 1) as f32
}

/// Magnitude-weighted mean index, normalized by the signal length.
pub fn spectral_centroid(signal: &[f32]) -> f32 {
    let (weighted, total) = signal
        .iter()
        .enumerate()
        .fold((0.0_f64, 0.0_f64), |(w, t), (i, &v)| {
            let mag = f64::from(v.abs());
            (w + i as f64 * mag, t + mag)
        });
    if total == 0.0 {
        return 0.0;
    }
    (weighted / total / signal.len() as f64) as f32
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
