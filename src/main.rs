//! Command-line entry point: one recognition cycle.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] and apply command-line overrides.
//! 3. Resolve the model description and the classifier strategy.
//! 4. Open the sound-level source (microphone, or synthetic fallback).
//! 5. Run one cycle on a current-thread tokio runtime and print the label.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use voice_recognition::{
    audio::{Sampler, SoundLevelSource, SyntheticLevelSource},
    classify::Classifier,
    config::AppConfig,
    pipeline::PipelineController,
    status::LogDisplay,
};

/// Record a short snippet and classify it into a keyword label.
#[derive(Parser, Debug)]
#[command(name = "voice-recognition", version, about, long_about = None)]
struct Cli {
    /// Settings file.  Defaults to the platform config dir.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Sample rate in Hz (8000 – 48000).
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Recording length in milliseconds (100 – 5000).
    #[arg(long)]
    duration_ms: Option<u32>,

    /// Print status strings while running.
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Also print the full label distribution as JSON.
    #[arg(long, default_value_t = false)]
    detailed: bool,

    /// Seed for the dither noise and the synthetic source.
    #[arg(long)]
    seed: Option<u64>,

    /// Use the synthetic source even when a microphone is available.
    #[arg(long, default_value_t = false)]
    synthetic: bool,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(rate) = self.sample_rate {
            config.recognition.sample_rate = rate;
        }
        if let Some(ms) = self.duration_ms {
            config.recognition.duration_ms = ms;
        }
        if self.debug {
            config.debug = true;
        }
    }

    /// RNG for one consumer; each `stream` derives its own seed.
    fn rng(&self, stream: u64) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(stream)),
            None => StdRng::from_entropy(),
        }
    }
}

const SOURCE_STREAM: u64 = 0;
const DITHER_STREAM: u64 = 1;

// ---------------------------------------------------------------------------
// Sound source
// ---------------------------------------------------------------------------

fn synthetic_source(cli: &Cli) -> Box<dyn SoundLevelSource> {
    Box::new(SyntheticLevelSource::new(cli.rng(SOURCE_STREAM), 128, 64))
}

#[cfg(feature = "microphone")]
fn open_source(cli: &Cli) -> Box<dyn SoundLevelSource> {
    if cli.synthetic {
        return synthetic_source(cli);
    }
    match voice_recognition::audio::MicLevelSource::open() {
        Ok(mic) => {
            log::info!("Microphone open ({} Hz device rate)", mic.device_rate());
            Box::new(mic)
        }
        Err(e) => {
            log::warn!("Microphone unavailable ({e}); using synthetic source");
            synthetic_source(cli)
        }
    }
}

#[cfg(not(feature = "microphone"))]
fn open_source(cli: &Cli) -> Box<dyn SoundLevelSource> {
    if !cli.synthetic {
        log::info!("Built without the `microphone` feature; using synthetic source");
    }
    synthetic_source(cli)
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None if AppConfig::is_first_run() => {
            log::info!("No settings file yet; using defaults");
            AppConfig::default()
        }
        None => AppConfig::load().unwrap_or_else(|e| {
            log::warn!("Failed to load config ({e}); using defaults");
            AppConfig::default()
        }),
    };
    cli.apply(&mut config);

    // No native module loader is linked into the CLI; the heuristic
    // fallback classifies against the configured model description.
    let props = config.model.properties()?;
    let mut classifier = Classifier::resolve(None, props, config.heuristic);
    if let Some(seed) = cli.seed {
        classifier = classifier.with_seed(seed);
    }

    let sampler = Sampler::with_rng(open_source(&cli), cli.rng(DITHER_STREAM));
    let mut controller = PipelineController::from_config(sampler, Box::new(LogDisplay), &config);
    if !controller.initialize(classifier) {
        bail!("classifier failed to initialize");
    }
    log::info!("Model: {}", controller.model_info());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("failed to create tokio runtime")?;

    let recognition = runtime
        .block_on(controller.recognize())
        .context("recognition did not start")?;

    println!("{}", recognition.label);
    if cli.detailed {
        println!("{}", controller.detailed_classification_json());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
