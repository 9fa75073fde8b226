//! Application settings structs, defaults and TOML persistence.
//!
//! ```toml
//! debug = false
//!
//! [recognition]
//! sample_rate = 16000
//! duration_ms = 1000
//!
//! [model]
//! properties_file = "/path/to/model.json"   # optional
//!
//! [heuristic]
//! speech_energy = 0.5
//! speech_zcr = 0.1
//! noise_energy = 0.3
//! noise_centroid = 0.4
//! silence_energy = 0.1
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::audio::sampler::{DEFAULT_DURATION_MS, DEFAULT_SAMPLE_RATE};
use crate::classify::{HeuristicThresholds, ModelProperties};

use super::AppPaths;

// ---------------------------------------------------------------------------
// RecognitionConfig
// ---------------------------------------------------------------------------

/// Recording parameters handed to the sampler at initialization.
///
/// Out-of-range values are not rejected here; the sampler ignores them and
/// keeps its defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Samples per second, 8 000 – 48 000.
    pub sample_rate: u32,
    /// Recording length in milliseconds, 100 – 5 000.
    pub duration_ms: u32,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            duration_ms: DEFAULT_DURATION_MS,
        }
    }
}

// ---------------------------------------------------------------------------
// ModelConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// JSON model description; `None` uses the built-in 10-label model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties_file: Option<PathBuf>,
}

impl ModelConfig {
    /// Resolve the model description, falling back to the built-in one.
    pub fn properties(&self) -> Result<ModelProperties> {
        match &self.properties_file {
            Some(path) => ModelProperties::load(path)
                .with_context(|| format!("loading model description {}", path.display())),
            None => Ok(ModelProperties::default()),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use voice_recognition::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Write short status strings to the status display.
    pub debug: bool,
    pub recognition: RecognitionConfig,
    pub model: ModelConfig,
    /// Thresholds for the fallback classifier.
    pub heuristic: HeuristicThresholds,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns `true` when no `settings.toml` file exists yet.
    pub fn is_first_run() -> bool {
        !AppPaths::new().settings_file.exists()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();
        assert!(!cfg.debug);
        assert_eq!(cfg.recognition.sample_rate, 16_000);
        assert_eq!(cfg.recognition.duration_ms, 1_000);
        assert!(cfg.model.properties_file.is_none());
        assert_eq!(cfg.heuristic, HeuristicThresholds::default());
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("settings.toml");

        let mut cfg = AppConfig::default();
        cfg.debug = true;
        cfg.recognition.sample_rate = 8_000;
        cfg.recognition.duration_ms = 250;
        cfg.model.properties_file = Some(dir.path().join("model.json"));
        cfg.heuristic.silence_energy = 0.05;

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "debug = true\n\n[recognition]\nduration_ms = 500\n").expect("write");

        let cfg = AppConfig::load_from(&path).expect("load");
        assert!(cfg.debug);
        assert_eq!(cfg.recognition.duration_ms, 500);
        assert_eq!(cfg.recognition.sample_rate, 16_000);
        assert_eq!(cfg.heuristic, HeuristicThresholds::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[recognition\nsample_rate = ").expect("write");

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("parsing"));
    }

    #[test]
    fn model_properties_default_without_file() {
        let props = ModelConfig::default().properties().expect("defaults");
        assert_eq!(props, ModelProperties::default());
    }

    #[test]
    fn model_properties_from_file() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("model.json");
        std::fs::write(&path, r#"{"labels": ["go", "stop"]}"#).expect("write");

        let cfg = ModelConfig {
            properties_file: Some(path),
        };
        let props = cfg.properties().expect("load");
        assert_eq!(props.labels, vec!["go", "stop"]);
    }

    #[test]
    fn missing_model_file_is_an_error() {
        let cfg = ModelConfig {
            properties_file: Some(PathBuf::from("/nonexistent/model.json")),
        };
        assert!(cfg.properties().is_err());
    }
}
