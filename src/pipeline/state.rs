//! Recognition state machine and completion outcome.

use crate::audio::sampler::StopReason;

// ---------------------------------------------------------------------------
// RecognitionState
// ---------------------------------------------------------------------------

/// States of one recognition cycle.
///
/// ```text
/// Idle ──start_recognition()──▶ Recording
///      ──sampler completed────▶ Classifying
///                               ──label stored──▶ Completed
/// Completed ──start_recognition()──▶ Recording
/// Completed ──clear_audio_buffer()─▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecognitionState {
    /// Nothing captured yet, or the buffer was cleared.
    #[default]
    Idle,

    /// The sampler is acquiring audio.
    Recording,

    /// The captured buffer is being classified.
    Classifying,

    /// A label is available.
    Completed,
}

impl RecognitionState {
    /// Returns `true` while a cycle is in progress.
    ///
    /// ```
    /// use voice_recognition::pipeline::RecognitionState;
    ///
    /// assert!(!RecognitionState::Idle.is_busy());
    /// assert!(RecognitionState::Recording.is_busy());
    /// assert!(RecognitionState::Classifying.is_busy());
    /// assert!(!RecognitionState::Completed.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            RecognitionState::Recording | RecognitionState::Classifying
        )
    }

    /// A short human-readable label for status output.
    pub fn label(&self) -> &'static str {
        match self {
            RecognitionState::Idle => "Idle",
            RecognitionState::Recording => "Recording",
            RecognitionState::Classifying => "Classifying",
            RecognitionState::Completed => "Done",
        }
    }
}

// ---------------------------------------------------------------------------
// Recognition
// ---------------------------------------------------------------------------

/// Outcome of one completed cycle, handed to the completion handler.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    /// Classified label; may be a sentinel such as `NO_DATA`.
    pub label: String,
    pub reason: StopReason,
    /// Samples acquired before padding.
    pub captured: usize,
    /// Buffer length handed to the classifier.
    pub len: usize,
}

impl Recognition {
    /// `true` when the recording was cut short by `stop()`, so the buffer
    /// may be shorter than the configured duration.
    pub fn was_stopped(&self) -> bool {
        self.reason == StopReason::Stopped
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
