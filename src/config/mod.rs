//! Configuration for voice recognition.
//!
//! Provides `AppConfig` (top-level settings), its sections, `AppPaths` for
//! cross-platform directories, and TOML persistence via `AppConfig::load` /
//! `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{AppConfig, ModelConfig, RecognitionConfig};
