//! Threshold classifier used when no native model is loaded.
//!
//! Whole-signal energy, zero-crossing rate and centroid are compared
//! against fixed thresholds; the first matching rule wins:
//!
//! | Rule | Condition                                  | Label     |
//! |------|--------------------------------------------|-----------|
//! | 1    | energy > 0.5 **and** zcr > 0.1             | `speech`  |
//! | 2    | energy > 0.3 **and** centroid > 0.4        | `noise`   |
//! | 3    | energy < 0.1                               | `silence` |
//! | 4    | otherwise                                  | `unknown` |

use serde::{Deserialize, Serialize};

use crate::audio::features::{energy, spectral_centroid, zero_crossing_rate};

use super::engine::{ClassifierBackend, ClassifyError};
use super::model::ModelProperties;

pub const SPEECH: &str = "speech";
pub const NOISE: &str = "noise";
pub const SILENCE: &str = "silence";
pub const UNKNOWN: &str = "unknown";

// ---------------------------------------------------------------------------
// HeuristicThresholds
// ---------------------------------------------------------------------------

/// Decision thresholds, applied to a signal normalized to `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicThresholds {
    pub speech_energy: f32,
    pub speech_zcr: f32,
    pub noise_energy: f32,
    pub noise_centroid: f32,
    pub silence_energy: f32,
}

impl Default for HeuristicThresholds {
    fn default() -> Self {
        Self {
            speech_energy: 0.5,
            speech_zcr: 0.1,
            noise_energy: 0.3,
            noise_centroid: 0.4,
            silence_energy: 0.1,
        }
    }
}

impl HeuristicThresholds {
    /// Apply the rule table to precomputed features.
    pub fn decide(&self, energy: f32, zcr: f32, centroid: f32) -> &'static str {
        if energy > self.speech_energy && zcr > self.speech_zcr {
            SPEECH
        } else if energy > self.noise_energy && centroid > self.noise_centroid {
            NOISE
        } else if energy < self.silence_energy {
            SILENCE
        } else {
            UNKNOWN
        }
    }
}

// ---------------------------------------------------------------------------
// HeuristicBackend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct HeuristicBackend {
    thresholds: HeuristicThresholds,
}

impl HeuristicBackend {
    pub fn new(thresholds: HeuristicThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> HeuristicThresholds {
        self.thresholds
    }
}

impl ClassifierBackend for HeuristicBackend {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn infer(&mut self, signal: &[f32], _props: &ModelProperties) -> Result<String, ClassifyError> {
        let e = energy(signal);
        let zcr = zero_crossing_rate(signal);
        let centroid = spectral_centroid(signal);
        let label = self.thresholds.decide(e, zcr, centroid);
        log::debug!(
            "classifier: heuristic energy={e:.3} zcr={zcr:.3} centroid={centroid:.3} → {label}"
        );
        Ok(label.to_string())
    }

    fn set_thresholds(&mut self, thresholds: HeuristicThresholds) {
        self.thresholds = thresholds;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::preprocess::condition_for_model;

    fn run(samples: &[i16]) -> String {
        let props = ModelProperties::default();
        let signal = condition_for_model(samples, props.required_input_length());
        HeuristicBackend::default()
            .infer(&signal, &props)
            .expect("heuristic never fails")
    }

    #[test]
    fn rule_order() {
        let t = HeuristicThresholds::default();
        assert_eq!(t.decide(0.6, 0.2, 0.9), SPEECH);
        assert_eq!(t.decide(0.6, 0.05, 0.5), NOISE);
        assert_eq!(t.decide(0.4, 0.05, 0.3), UNKNOWN);
        assert_eq!(t.decide(0.05, 0.9, 0.9), SILENCE);
        assert_eq!(t.decide(0.2, 0.5, 0.5), UNKNOWN);
    }

    #[test]
    fn thresholds_are_strict() {
        let t = HeuristicThresholds::default();
        // exactly at the speech bounds falls through to noise
        assert_eq!(t.decide(0.5, 0.1, 0.5), NOISE);
        // exactly at the silence bound is not silence
        assert_eq!(t.decide(0.1, 0.0, 0.0), UNKNOWN);
    }

    #[test]
    fn all_zero_is_silence() {
        assert_eq!(run(&[0; 1]), SILENCE);
        assert_eq!(run(&[0; 16_000]), SILENCE);
    }

    #[test]
    fn alternating_full_length_signal_is_speech() {
        let samples: Vec<i16> = (0..16_000).map(|i| if i % 2 == 0 { 8_000 } else { -8_000 }).collect();
        assert_eq!(run(&samples), SPEECH);
    }

    #[test]
    fn constant_full_length_signal_is_noise() {
        // windowed DC: high energy, no crossings, centroid at the centre
        assert_eq!(run(&[8_000; 16_000]), NOISE);
    }

    #[test]
    fn custom_thresholds_change_outcome() {
        let mut backend = HeuristicBackend::default();
        assert_eq!(backend.thresholds(), HeuristicThresholds::default());
        backend.set_thresholds(HeuristicThresholds {
            silence_energy: 0.9,
            ..HeuristicThresholds::default()
        });
        assert_eq!(backend.thresholds().silence_energy, 0.9);
        let props = ModelProperties::default();
        let signal = condition_for_model(&[8_000; 16_000], 16_000);
        // rule 2 still wins before the widened silence rule
        assert_eq!(backend.infer(&signal, &props).unwrap(), NOISE);

        backend.set_thresholds(HeuristicThresholds {
            noise_energy: 0.99,
            silence_energy: 0.9,
            ..HeuristicThresholds::default()
        });
        assert_eq!(backend.infer(&signal, &props).unwrap(), SILENCE);
    }
}
