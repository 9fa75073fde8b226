//! Recognition pipeline.
//!
//! # Architecture
//!
//! ```text
//! SoundLevelSource ──tick──▶ Sampler ──Completion──▶ PipelineController
//!                                                       │
//!                                                       ├─ Classifier::classify
//!                                                       ├─ store buffer + label
//!                                                       ├─ StatusDisplay ("DONE")
//!                                                       └─ completion handler(&Recognition)
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use voice_recognition::audio::{Sampler, SyntheticLevelSource};
//! use voice_recognition::classify::{Classifier, HeuristicThresholds, ModelProperties};
//! use voice_recognition::pipeline::PipelineController;
//! use voice_recognition::status::LogDisplay;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let source = SyntheticLevelSource::new(StdRng::seed_from_u64(1), 128, 40);
//!     let mut controller = PipelineController::new(Sampler::new(source), Box::new(LogDisplay));
//!     controller.initialize(Classifier::resolve(
//!         None,
//!         ModelProperties::default(),
//!         HeuristicThresholds::default(),
//!     ));
//!     controller.on_recognition_completed(|r| println!("heard {}", r.label));
//!     controller.recognize().await;
//! }
//! ```

pub mod controller;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use controller::{
    CompletionHandler, PipelineController, STATUS_DONE, STATUS_INIT_ERR, STATUS_INIT_OK,
    STATUS_NOT_INIT, STATUS_RECORDING,
};
pub use state::{Recognition, RecognitionState};
