//! Bounded capture buffer for signed 16-bit audio samples.
//!
//! Unlike a ring buffer, [`AudioBuffer`] never overwrites: once `capacity`
//! samples are stored further pushes are rejected.  The sampler sizes the
//! buffer to `sample_rate × duration_ms / 1000` at the start of every
//! recording and pads it back up to capacity when the clock stops first.
//!
//! # Example
//!
//! ```rust
//! use voice_recognition::audio::AudioBuffer;
//!
//! let mut buf = AudioBuffer::with_capacity(4);
//! buf.push(10);
//! buf.push(-20);
//! buf.pad_to_capacity();
//! assert_eq!(buf.as_slice(), &[10, -20, -20, -20]);
//! ```

/// One acquisition tick worth of audio, in `[-32768, 32767]`.
pub type AudioSample = i16;

// ---------------------------------------------------------------------------
// AudioBuffer
// ---------------------------------------------------------------------------

/// An ordered, capacity-bounded sequence of [`AudioSample`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<AudioSample>,
    capacity: usize,
}

impl AudioBuffer {
    /// Create an empty buffer that accepts at most `capacity` samples.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Wrap already captured samples; capacity equals their length.
    pub fn from_samples(samples: Vec<AudioSample>) -> Self {
        let capacity = samples.len();
        Self { samples, capacity }
    }

    /// Append one sample.  Returns `false` (and drops the sample) when the
    /// buffer is already full.
    pub fn push(&mut self, sample: AudioSample) -> bool {
        if self.is_full() {
            return false;
        }
        self.samples.push(sample);
        true
    }

    /// Repeat the last sample (or `0` when empty) until `len() == capacity`.
    ///
    /// Returns the number of samples added.
    pub fn pad_to_capacity(&mut self) -> usize {
        let missing = self.capacity.saturating_sub(self.samples.len());
        let fill = self.samples.last().copied().unwrap_or(0);
        self.samples.resize(self.capacity, fill);
        missing
    }

    /// Replace the contents with `samples`, keeping the logical length.
    ///
    /// Used after preprocessing, which rescales values but never changes
    /// the sample count.
    pub fn replace(&mut self, samples: Vec<AudioSample>) {
        debug_assert_eq!(samples.len(), self.samples.len());
        self.samples = samples;
    }

    /// Discard all samples; capacity is kept.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Discard all samples and set a new capacity.
    pub fn reset(&mut self, capacity: usize) {
        self.samples.clear();
        self.samples.reserve(capacity);
        self.capacity = capacity;
    }

    pub fn as_slice(&self) -> &[AudioSample] {
        &self.samples
    }

    pub fn into_vec(self) -> Vec<AudioSample> {
        self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// `true` once `capacity` samples have been stored.
    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    /// Duration covered by the stored samples at `sample_rate` Hz.
    pub fn duration_secs(&self, sample_rate: u32) -> f32 {
        if sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / sample_rate as f32
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
