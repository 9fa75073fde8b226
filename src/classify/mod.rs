//! Keyword classification.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                        Classifier                          │
//! │                                                            │
//! │   samples ─▶ condition_for_model ─▶ ClassifierBackend      │
//! │                                       │                    │
//! │                    ┌──────────────────┴─────────────┐      │
//! │                    ▼                                ▼      │
//! │           NativeBackend<M>                 HeuristicBackend│
//! │           malloc/write/run/read            energy/zcr/     │
//! │           → argmax(labels)                 centroid rules  │
//! │                    └──────────────┬─────────────────┘      │
//! │                                   ▼                        │
//! │               label  (or sentinel on failure)              │
//! │               ClassificationResult (distribution, timing)  │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! The backend is chosen once, in [`Classifier::resolve`]: a loaded native
//! module wins, otherwise the heuristic fallback is used.
//!
//! # Quick start
//!
//! ```rust
//! use voice_recognition::classify::{Classifier, HeuristicThresholds, ModelProperties};
//!
//! let mut classifier =
//!     Classifier::resolve(None, ModelProperties::default(), HeuristicThresholds::default());
//! assert_eq!(classifier.classify(&[0; 16_000]), "silence");
//! assert_eq!(classifier.classify(&[]), "NO_DATA");
//! ```

pub mod distribution;
pub mod engine;
pub mod heuristic;
pub mod model;
pub mod native;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use engine::{
    is_sentinel, ClassificationResult, Classifier, ClassifierBackend, ClassifyError, Timing,
    CLASSIFICATION_ERROR, NOT_INITIALIZED, NO_DATA,
};
pub use heuristic::{HeuristicBackend, HeuristicThresholds};
pub use model::{ModelError, ModelProperties, DEFAULT_LABELS};
pub use native::{NativeBackend, NativeError, NativeModule, Ptr};

// test-only re-export so the pipeline tests can build a native classifier
// without reaching into `classify::native`.
#[cfg(test)]
pub use native::MockModule;
