//! Audio front end: sound level → sampler → preprocessor → features.
//!
//! # Pipeline
//!
//! ```text
//! SoundLevelSource ──tick──▶ Sampler ──▶ AudioBuffer (i16)
//!                                  └─completion─▶ preprocess (in place)
//!                                                  └─▶ features::extract
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use voice_recognition::audio::{drive, Sampler, SyntheticLevelSource};
//!
//! # async fn example() {
//! let source = SyntheticLevelSource::new(rand::thread_rng(), 128, 20);
//! let mut sampler = Sampler::new(source);
//! sampler.configure(16_000, 500);
//! sampler.start();
//! let completion = drive(&mut sampler).await;
//! println!("{completion:?}, {} samples", sampler.audio_data().len());
//! # }
//! ```

pub mod buffer;
#[cfg(feature = "microphone")]
pub mod capture;
pub mod features;
pub mod preprocess;
pub mod sampler;
pub mod source;

pub use buffer::{AudioBuffer, AudioSample};
#[cfg(feature = "microphone")]
pub use capture::{CaptureError, MicLevelSource};
pub use features::{extract, extract_frames, FrameFeatures, FrameLayout};
pub use preprocess::{condition_for_model, preprocess};
pub use sampler::{
    drive, Completion, RecordingSession, Sampler, SamplerState, StopHandle, StopReason, Tick,
};
pub use source::{GainTier, SoundLevelSource, SyntheticLevelSource};
