//! Model description: label set, input geometry and sample rate.
//!
//! A description comes either from the native module's property query, from
//! a JSON file, or from [`ModelProperties::default`] (the built-in 10-label
//! keyword-spotting model).
//!
//! ```json
//! {
//!   "project_name": "Keywords",
//!   "labels": ["unknown", "yes", "no"],
//!   "frequency": 16000,
//!   "frame_sample_count": 16000
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio::sampler::{MAX_DURATION_MS, MAX_SAMPLE_RATE};

/// Labels of the built-in model, in score order.
pub const DEFAULT_LABELS: [&str; 10] = [
    "unknown", "yes", "no", "up", "down", "left", "right", "on", "off", "stop",
];

pub const DEFAULT_FREQUENCY: u32 = 16_000;
pub const DEFAULT_INPUT_LENGTH: usize = 16_000;

/// Longest input a model may ask for: the largest buffer the sampler fills.
pub const MAX_INPUT_LENGTH: usize = MAX_SAMPLE_RATE as usize * MAX_DURATION_MS as usize / 1_000;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model description {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid model description: {0}")]
    Json(#[from] serde_json::Error),

    #[error("model description has an empty label set")]
    NoLabels,

    #[error("model input length {len} exceeds the maximum of {max} samples")]
    InputTooLong { len: usize, max: usize },
}

/// Immutable description of the classifier model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProperties {
    #[serde(default = "default_project_name")]
    pub project_name: String,
    /// Ordered label set; score `i` belongs to `labels[i]`.
    pub labels: Vec<String>,
    /// Sample rate the model was trained on.
    #[serde(default = "default_frequency")]
    pub frequency: u32,
    #[serde(default = "default_input_length")]
    pub frame_sample_count: usize,
    #[serde(default)]
    pub frame_stride: usize,
    /// Overrides `frame_sample_count` as the input length when present.
    #[serde(default)]
    pub input_width: Option<usize>,
    #[serde(default)]
    pub has_anomaly: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,
}

fn default_project_name() -> String {
    "Voice Recognition Model".into()
}

fn default_frequency() -> u32 {
    DEFAULT_FREQUENCY
}

fn default_input_length() -> usize {
    DEFAULT_INPUT_LENGTH
}

impl Default for ModelProperties {
    fn default() -> Self {
        Self {
            project_name: default_project_name(),
            labels: DEFAULT_LABELS.iter().map(|l| l.to_string()).collect(),
            frequency: DEFAULT_FREQUENCY,
            frame_sample_count: DEFAULT_INPUT_LENGTH,
            frame_stride: 8_000,
            input_width: Some(DEFAULT_INPUT_LENGTH),
            has_anomaly: false,
            model_path: None,
        }
    }
}

impl ModelProperties {
    /// Parse and validate a JSON description.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let props: Self = serde_json::from_str(json)?;
        props.validate()?;
        Ok(props)
    }

    /// Load a JSON description from disk and remember where it came from.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let json = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut props = Self::from_json(&json)?;
        props.model_path.get_or_insert_with(|| path.to_path_buf());
        Ok(props)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.labels.is_empty() {
            return Err(ModelError::NoLabels);
        }
        let len = self.required_input_length();
        if len > MAX_INPUT_LENGTH {
            return Err(ModelError::InputTooLong {
                len,
                max: MAX_INPUT_LENGTH,
            });
        }
        Ok(())
    }

    /// Number of samples the model consumes per inference.
    pub fn required_input_length(&self) -> usize {
        match self.input_width {
            Some(width) if width > 0 => width,
            _ if self.frame_sample_count > 0 => self.frame_sample_count,
            _ => DEFAULT_INPUT_LENGTH,
        }
    }

    /// Short human-readable summary, e.g. `"Keywords (3 classes)"`.
    pub fn info(&self) -> String {
        format!("{} ({} classes)", self.project_name, self.labels.len())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
