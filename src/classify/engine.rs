//! Classifier contract, error sentinels and strategy resolution.
//!
//! # Overview
//!
//! [`ClassifierBackend`] is the seam between the two strategies: the
//! model-backed [`NativeBackend`] and the always-available
//! [`HeuristicBackend`].  [`Classifier`] picks one once, at
//! initialization, and holds it as a `Box<dyn ClassifierBackend>`.
//!
//! Callers see classification as infallible: [`Classifier::classify`]
//! always returns a label, and failures come back as one of the sentinel
//! labels below.  [`Classifier::try_classify`] exposes the typed error.

use std::collections::BTreeMap;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use thiserror::Error;

use crate::audio::buffer::AudioSample;
use crate::audio::preprocess::condition_for_model;

use super::distribution;
use super::heuristic::{HeuristicBackend, HeuristicThresholds};
use super::model::ModelProperties;
use super::native::{NativeBackend, NativeError, NativeModule};

pub const NOT_INITIALIZED: &str = "MODEL_NOT_INITIALIZED";
pub const NO_DATA: &str = "NO_DATA";
pub const CLASSIFICATION_ERROR: &str = "CLASSIFICATION_ERROR";

/// Key used in the distribution of a failed detailed classification.
pub const ERROR_KEY: &str = "error";

// ---------------------------------------------------------------------------
// ClassifyError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassifyError {
    #[error("classifier has not been initialized")]
    NotInitialized,

    #[error("no audio data to classify")]
    NoData,

    #[error(transparent)]
    Native(#[from] NativeError),

    #[error("malformed inference result: {0}")]
    Malformed(String),
}

impl ClassifyError {
    /// The label string reported in place of a classification.
    pub fn sentinel(&self) -> &'static str {
        match self {
            ClassifyError::NotInitialized => NOT_INITIALIZED,
            ClassifyError::NoData => NO_DATA,
            ClassifyError::Native(_) | ClassifyError::Malformed(_) => CLASSIFICATION_ERROR,
        }
    }
}

/// `true` for the labels [`Classifier::classify`] uses to report failure.
pub fn is_sentinel(label: &str) -> bool {
    matches!(label, NOT_INITIALIZED | NO_DATA | CLASSIFICATION_ERROR)
}

// ---------------------------------------------------------------------------
// ClassifierBackend
// ---------------------------------------------------------------------------

/// One classification strategy.
///
/// `signal` has already been fitted to the model's input length, windowed
/// and normalized to `[-1, 1]`.
pub trait ClassifierBackend {
    fn name(&self) -> &'static str;

    fn infer(&mut self, signal: &[f32], props: &ModelProperties) -> Result<String, ClassifyError>;

    /// Only meaningful for threshold-based strategies.
    fn set_thresholds(&mut self, _thresholds: HeuristicThresholds) {}
}

// Compile-time assertion: Box<dyn ClassifierBackend> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn ClassifierBackend>) {}
};

// ---------------------------------------------------------------------------
// ClassificationResult
// ---------------------------------------------------------------------------

/// Wall-clock cost of each stage, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Timing {
    pub dsp: f64,
    pub classification: f64,
    pub anomaly: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    /// Selected label, or a sentinel on failure.
    pub label: String,
    /// Label → probability; sums to one.
    pub classification: BTreeMap<String, f64>,
    pub anomaly: f64,
    pub timing: Timing,
}

impl ClassificationResult {
    /// Result reported when detailed classification fails.
    pub fn failed(error: &ClassifyError) -> Self {
        Self {
            label: error.sentinel().to_string(),
            classification: BTreeMap::from([(ERROR_KEY.to_string(), 1.0)]),
            anomaly: 0.0,
            timing: Timing::default(),
        }
    }

    pub fn is_error(&self) -> bool {
        is_sentinel(&self.label)
    }

    /// Highest-probability entry.
    pub fn top(&self) -> Option<(&str, f64)> {
        self.classification
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(label, &p)| (label.as_str(), p))
    }

    pub fn to_json(&self) -> String {
        // BTreeMap<String, f64> and plain structs cannot fail to serialize.
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

struct Resolved {
    props: ModelProperties,
    backend: Box<dyn ClassifierBackend>,
}

/// The classification contract used by the pipeline.
pub struct Classifier {
    resolved: Option<Resolved>,
    rng: StdRng,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::uninitialized()
    }
}

impl Classifier {
    /// A classifier with no model; every call reports "not initialized".
    pub fn uninitialized() -> Self {
        Self {
            resolved: None,
            rng: StdRng::from_entropy(),
        }
    }

    fn with_backend(props: ModelProperties, backend: Box<dyn ClassifierBackend>) -> Self {
        log::info!(
            "classifier: {} backend, {}",
            backend.name(),
            props.info()
        );
        Self {
            resolved: Some(Resolved { props, backend }),
            rng: StdRng::from_entropy(),
        }
    }

    /// Pick the strategy once: the native module when present, otherwise
    /// the heuristic fallback.
    ///
    /// `fallback_props` is used for the heuristic path and whenever the
    /// module's property query fails.
    pub fn resolve(
        module: Option<Box<dyn NativeModule>>,
        fallback_props: ModelProperties,
        thresholds: HeuristicThresholds,
    ) -> Self {
        let fallback_props = match fallback_props.validate() {
            Ok(()) => fallback_props,
            Err(e) => {
                log::warn!("classifier: invalid model description ({e}); using defaults");
                ModelProperties::default()
            }
        };

        match module {
            Some(mut module) => {
                let props = match module.properties().and_then(|p| {
                    p.validate()
                        .map_err(|e| NativeError::Properties(e.to_string()))?;
                    Ok(p)
                }) {
                    Ok(props) => props,
                    Err(e) => {
                        log::warn!("classifier: property query failed ({e}); using defaults");
                        fallback_props
                    }
                };
                Self::with_backend(props, Box::new(NativeBackend::new(module)))
            }
            None => {
                log::warn!("classifier: no native module loaded; using heuristic fallback");
                Self::with_backend(fallback_props, Box::new(HeuristicBackend::new(thresholds)))
            }
        }
    }

    /// Reseed the RNG behind the detailed distribution.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.resolved.is_some()
    }

    pub fn properties(&self) -> Option<&ModelProperties> {
        self.resolved.as_ref().map(|r| &r.props)
    }

    /// Name of the resolved strategy (`"native"` / `"heuristic"`).
    pub fn backend_name(&self) -> Option<&'static str> {
        self.resolved.as_ref().map(|r| r.backend.name())
    }

    pub fn set_thresholds(&mut self, thresholds: HeuristicThresholds) {
        if let Some(resolved) = self.resolved.as_mut() {
            resolved.backend.set_thresholds(thresholds);
        }
    }

    /// Classify `samples`, reporting failures as a typed error.
    pub fn try_classify(&mut self, samples: &[AudioSample]) -> Result<String, ClassifyError> {
        let Resolved { props, backend } = self.resolved.as_mut().ok_or(ClassifyError::NotInitialized)?;
        if samples.is_empty() {
            return Err(ClassifyError::NoData);
        }
        let signal = condition_for_model(samples, props.required_input_length());
        backend.infer(&signal, props)
    }

    /// Classify `samples`; failures come back as a sentinel label.
    pub fn classify(&mut self, samples: &[AudioSample]) -> String {
        match self.try_classify(samples) {
            Ok(label) => label,
            Err(e) => {
                log_failure(&e);
                e.sentinel().to_string()
            }
        }
    }

    /// Classify and synthesize a full label distribution with timings.
    pub fn classify_detailed(&mut self, samples: &[AudioSample]) -> ClassificationResult {
        match self.try_classify_detailed(samples) {
            Ok(result) => result,
            Err(e) => {
                log_failure(&e);
                ClassificationResult::failed(&e)
            }
        }
    }

    fn try_classify_detailed(
        &mut self,
        samples: &[AudioSample],
    ) -> Result<ClassificationResult, ClassifyError> {
        let Resolved { props, backend } = self.resolved.as_mut().ok_or(ClassifyError::NotInitialized)?;
        if samples.is_empty() {
            return Err(ClassifyError::NoData);
        }

        let dsp_start = Instant::now();
        let signal = condition_for_model(samples, props.required_input_length());
        let dsp = dsp_start.elapsed();

        let class_start = Instant::now();
        let label = backend.infer(&signal, props)?;
        let classification = distribution::synthesize(&label, &props.labels, &mut self.rng);
        let class = class_start.elapsed();

        Ok(ClassificationResult {
            label,
            classification,
            anomaly: 0.0,
            timing: Timing {
                dsp: dsp.as_secs_f64() * 1_000.0,
                classification: class.as_secs_f64() * 1_000.0,
                anomaly: 0.0,
            },
        })
    }
}

/// Rejected calls log at `warn`, inference failures at `error`.
fn failure_level(error: &ClassifyError) -> log::Level {
    match error {
        ClassifyError::NotInitialized | ClassifyError::NoData => log::Level::Warn,
        ClassifyError::Native(_) | ClassifyError::Malformed(_) => log::Level::Error,
    }
}

fn log_failure(error: &ClassifyError) {
    log::log!(failure_level(error), "classifier: {error}");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::heuristic::SILENCE;
    use crate::classify::native::MockModule;

    fn heuristic() -> Classifier {
        Classifier::resolve(None, ModelProperties::default(), HeuristicThresholds::default())
            .with_seed(1)
    }

    fn native(module: MockModule) -> Classifier {
        Classifier::resolve(
            Some(Box::new(module)),
            ModelProperties::default(),
            HeuristicThresholds::default(),
        )
        .with_seed(1)
    }

    fn scores_with_top(index: usize) -> Vec<i32> {
        let mut scores = vec![0; 10];
        scores[index] = 100;
        scores
    }

    #[test]
    fn uninitialized_reports_sentinel() {
        let mut c = Classifier::uninitialized();
        assert!(!c.is_initialized());
        assert_eq!(c.classify(&[1, 2, 3]), NOT_INITIALIZED);
        assert_eq!(c.try_classify(&[1]), Err(ClassifyError::NotInitialized));

        let detailed = c.classify_detailed(&[1, 2, 3]);
        assert!(detailed.is_error());
        assert_eq!(detailed.classification.get(ERROR_KEY), Some(&1.0));
    }

    #[test]
    fn empty_input_is_no_data_for_both_strategies() {
        assert_eq!(heuristic().classify(&[]), NO_DATA);
        assert_eq!(native(MockModule::with_scores(vec![1; 10])).classify(&[]), NO_DATA);
    }

    #[test]
    fn resolves_heuristic_without_module() {
        let c = heuristic();
        assert_eq!(c.backend_name(), Some("heuristic"));
        assert_eq!(c.properties().map(|p| p.labels.len()), Some(10));
    }

    #[test]
    fn resolves_native_with_module_properties() {
        let mut module = MockModule::with_scores(vec![0, 7]);
        module.props = Ok(ModelProperties::from_json(r#"{"labels": ["off", "on"], "input_width": 32}"#).unwrap());
        let mut c = native(module);
        assert_eq!(c.backend_name(), Some("native"));
        assert_eq!(c.classify(&[5; 10]), "on");
    }

    #[test]
    fn failed_property_query_falls_back_to_defaults() {
        let mut module = MockModule::with_scores(scores_with_top(4));
        module.props = Err(NativeError::Properties("no symbol".into()));
        let mut c = native(module);
        assert_eq!(c.backend_name(), Some("native"));
        assert_eq!(c.properties(), Some(&ModelProperties::default()));
        assert_eq!(c.classify(&[1; 100]), "down");
    }

    #[test]
    fn native_failure_degrades_to_error_label() {
        let mut module = MockModule::with_scores(vec![1; 10]);
        module.fail_inference = true;
        let mut c = native(module);
        assert_eq!(c.classify(&[1; 100]), CLASSIFICATION_ERROR);
        assert!(c.classify_detailed(&[1; 100]).is_error());
    }

    #[test]
    fn heuristic_all_zero_is_silence() {
        assert_eq!(heuristic().classify(&[0; 1]), SILENCE);
        assert_eq!(heuristic().classify(&[0; 20_000]), SILENCE);
    }

    #[test]
    fn detailed_distribution_is_well_formed() {
        let mut c = native(MockModule::with_scores(scores_with_top(1)));
        for _ in 0..20 {
            let result = c.classify_detailed(&[3; 500]);
            assert_eq!(result.label, "yes");
            let sum: f64 = result.classification.values().sum();
            assert!((sum - 1.0).abs() < 1e-6);
            assert!(result.classification.values().all(|&p| p >= 0.0));
            assert_eq!(result.top().map(|(l, _)| l), Some("yes"));
            assert_eq!(result.anomaly, 0.0);
            assert!(result.timing.dsp >= 0.0 && result.timing.classification >= 0.0);
        }
    }

    #[test]
    fn detailed_heuristic_includes_heuristic_label() {
        let result = heuristic().classify_detailed(&[0; 64]);
        assert_eq!(result.label, SILENCE);
        assert_eq!(result.top().map(|(l, _)| l), Some(SILENCE));
        assert_eq!(result.classification.len(), 11);
    }

    #[test]
    fn detailed_json_has_expected_shape() {
        let json = heuristic().classify_detailed(&[0; 64]).to_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["label"], "silence");
        assert!(value["classification"].is_object());
        assert!(value["timing"]["dsp"].is_number());
    }

    #[test]
    fn invalid_module_properties_fall_back_to_defaults() {
        let mut module = MockModule::with_scores(scores_with_top(9));
        module.props = Ok(ModelProperties {
            labels: Vec::new(),
            ..ModelProperties::default()
        });
        let mut c = native(module);
        assert_eq!(c.properties().map(|p| p.labels.len()), Some(10));
        assert_eq!(c.classify(&[1; 100]), "stop");
    }

    #[test]
    fn oversized_module_input_length_falls_back_to_defaults() {
        let mut module = MockModule::with_scores(scores_with_top(1));
        module.props = Ok(ModelProperties {
            input_width: Some(usize::MAX),
            ..ModelProperties::default()
        });
        let mut c = native(module);
        assert_eq!(c.properties(), Some(&ModelProperties::default()));
        assert_eq!(c.classify(&[1, 2, 3]), "yes");
    }

    #[test]
    fn oversized_fallback_description_is_replaced_by_defaults() {
        let props = ModelProperties {
            labels: vec!["a".into(), "b".into()],
            input_width: Some(usize::MAX),
            ..ModelProperties::default()
        };
        let mut c = Classifier::resolve(None, props, HeuristicThresholds::default());
        assert_eq!(c.properties().map(|p| p.required_input_length()), Some(16_000));
        assert_eq!(c.classify(&[0, 0, 0]), SILENCE);
    }

    #[test]
    fn rejections_log_below_inference_failures() {
        assert_eq!(failure_level(&ClassifyError::NoData), log::Level::Warn);
        assert_eq!(failure_level(&ClassifyError::NotInitialized), log::Level::Warn);
        assert_eq!(
            failure_level(&ClassifyError::Native(NativeError::Alloc(4))),
            log::Level::Error
        );
        assert_eq!(
            failure_level(&ClassifyError::Malformed("short".into())),
            log::Level::Error
        );
    }

    #[test]
    fn sentinels_are_recognized() {
        assert!(is_sentinel(NO_DATA));
        assert!(is_sentinel(NOT_INITIALIZED));
        assert!(is_sentinel(CLASSIFICATION_ERROR));
        assert!(!is_sentinel("yes"));
    }
}
