//! Recognition controller: sampler → classifier → completion handler.
//!
//! [`PipelineController`] owns the sampler, the resolved classifier and the
//! most recent buffer and label.  Everything runs on one execution context:
//! [`run`](PipelineController::run) awaits the sampler's timer loop, then
//! classifies synchronously and notifies the handler before returning.
//!
//! ```text
//! start_recognition() ──▶ Sampler::start      [Recording]
//! run().await         ──▶ drive(sampler)      (one await per tick)
//!                     ──▶ Classifier::classify_detailed [Classifying]
//!                     ──▶ store label, handler(&Recognition) [Completed]
//! ```

use crate::audio::features;
use crate::audio::sampler::{drive, Completion, Sampler, StopHandle};
use crate::audio::{AudioSample, SoundLevelSource};
use crate::classify::{ClassificationResult, Classifier, HeuristicThresholds};
use crate::config::AppConfig;
use crate::status::StatusDisplay;

use super::state::{Recognition, RecognitionState};

pub const STATUS_INIT_OK: &str = "INIT OK";
pub const STATUS_INIT_ERR: &str = "INIT ERR";
pub const STATUS_NOT_INIT: &str = "NOT INIT";
pub const STATUS_RECORDING: &str = "RECORDING";
pub const STATUS_DONE: &str = "DONE";

/// Callback invoked once per completed recognition.
pub type CompletionHandler = Box<dyn FnMut(&Recognition)>;

// ---------------------------------------------------------------------------
// PipelineController
// ---------------------------------------------------------------------------

pub struct PipelineController<S> {
    sampler: Sampler<S>,
    classifier: Classifier,
    display: Box<dyn StatusDisplay>,
    debug: bool,
    state: RecognitionState,
    last_label: String,
    last_result: Option<ClassificationResult>,
    handler: Option<CompletionHandler>,
}

impl<S: SoundLevelSource> PipelineController<S> {
    pub fn new(sampler: Sampler<S>, display: Box<dyn StatusDisplay>) -> Self {
        Self {
            sampler,
            classifier: Classifier::uninitialized(),
            display,
            debug: false,
            state: RecognitionState::Idle,
            last_label: String::new(),
            last_result: None,
            handler: None,
        }
    }

    /// Build a controller with the recording and debug settings of `config`.
    pub fn from_config(
        sampler: Sampler<S>,
        display: Box<dyn StatusDisplay>,
        config: &AppConfig,
    ) -> Self {
        let mut controller = Self::new(sampler, display);
        controller.set_sample_rate(config.recognition.sample_rate);
        controller.set_recording_duration(config.recognition.duration_ms);
        controller.set_debug_mode(config.debug);
        controller
    }

    /// Install the resolved classifier.  Returns `false` (and stays
    /// uninitialized) when `classifier` has no strategy.
    pub fn initialize(&mut self, classifier: Classifier) -> bool {
        if !classifier.is_initialized() {
            log::warn!("pipeline: initialization failed, classifier has no backend");
            self.status(STATUS_INIT_ERR);
            return false;
        }
        self.classifier = classifier;
        log::info!(
            "pipeline: initialized ({} backend, {} Hz, {} ms)",
            self.classifier.backend_name().unwrap_or("?"),
            self.sampler.sample_rate(),
            self.sampler.duration_ms()
        );
        self.status(STATUS_INIT_OK);
        true
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    /// Forwarded to the sampler; out-of-range values are ignored there.
    pub fn set_sample_rate(&mut self, rate: u32) {
        self.sampler.set_sample_rate(rate);
    }

    /// Forwarded to the sampler; out-of-range values are ignored there.
    pub fn set_recording_duration(&mut self, duration_ms: u32) {
        self.sampler.set_duration_ms(duration_ms);
    }

    pub fn set_debug_mode(&mut self, enabled: bool) {
        self.debug = enabled;
    }

    pub fn set_thresholds(&mut self, thresholds: HeuristicThresholds) {
        self.classifier.set_thresholds(thresholds);
    }

    /// Register the completion handler, replacing any previous one.
    pub fn on_recognition_completed(&mut self, handler: impl FnMut(&Recognition) + 'static) {
        if self.handler.replace(Box::new(handler)).is_some() {
            log::debug!("pipeline: completion handler replaced");
        }
    }

    // -----------------------------------------------------------------------
    // Recognition cycle
    // -----------------------------------------------------------------------

    /// Begin recording.  Rejected when not initialized or already
    /// recording; the rejection is only visible through the status display.
    pub fn start_recognition(&mut self) -> bool {
        if !self.classifier.is_initialized() {
            log::warn!("pipeline: start rejected, not initialized");
            self.status(STATUS_NOT_INIT);
            return false;
        }
        if self.sampler.is_recording() {
            log::debug!("pipeline: start rejected, already recording");
            self.status(STATUS_RECORDING);
            return false;
        }

        self.sampler.start();
        self.state = RecognitionState::Recording;
        log::debug!("pipeline: state → {}", self.state.label());
        true
    }

    /// Request an early stop; observed at the next tick.
    pub fn stop_recording(&self) {
        self.sampler.stop();
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.sampler.stop_handle()
    }

    /// Drive the current recording to completion, then classify it.
    ///
    /// Returns `None` when nothing is recording.
    pub async fn run(&mut self) -> Option<Recognition> {
        let completion = drive(&mut self.sampler).await?;
        Some(self.finish(completion))
    }

    /// `start_recognition` followed by `run`.
    pub async fn recognize(&mut self) -> Option<Recognition> {
        if !self.start_recognition() {
            return None;
        }
        self.run().await
    }

    fn finish(&mut self, completion: Completion) -> Recognition {
        self.state = RecognitionState::Classifying;
        log::debug!("pipeline: state → {}", self.state.label());

        let result = self.classifier.classify_detailed(self.sampler.audio_data());
        let label = result.label.clone();
        self.last_label = label.clone();
        self.last_result = Some(result);
        self.state = RecognitionState::Completed;
        log::info!(
            "pipeline: recognized {label:?} ({:?}, {} captured, {} samples)",
            completion.reason,
            completion.captured,
            completion.len
        );
        self.status(STATUS_DONE);

        let recognition = Recognition {
            label,
            reason: completion.reason,
            captured: completion.captured,
            len: completion.len,
        };
        if let Some(handler) = self.handler.as_mut() {
            handler(&recognition);
        }
        recognition
    }

    fn status(&mut self, status: &str) {
        if self.debug {
            self.display.show(status);
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Most recent label; empty before the first completion.
    pub fn recognition_result(&self) -> &str {
        &self.last_label
    }

    /// Case-insensitive equality with the most recent label.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.last_label.to_lowercase() == keyword.to_lowercase()
    }

    /// Case-insensitive substring test against the most recent label.
    pub fn contains_text(&self, text: &str) -> bool {
        self.last_label
            .to_lowercase()
            .contains(&text.to_lowercase())
    }

    pub fn audio_buffer(&self) -> &[AudioSample] {
        self.sampler.audio_data()
    }

    pub fn audio_buffer_len(&self) -> usize {
        self.sampler.audio_data().len()
    }

    /// Drop the captured buffer.  Ignored while recording.
    pub fn clear_audio_buffer(&mut self) {
        if self.sampler.is_recording() {
            log::debug!("pipeline: clear ignored while recording");
            return;
        }
        self.sampler.clear_audio_buffer();
        self.last_result = None;
        self.state = RecognitionState::Idle;
    }

    pub fn sample_rate(&self) -> u32 {
        self.sampler.sample_rate()
    }

    pub fn recording_duration_ms(&self) -> u32 {
        self.sampler.duration_ms()
    }

    pub fn is_initialized(&self) -> bool {
        self.classifier.is_initialized()
    }

    pub fn is_recording(&self) -> bool {
        self.sampler.is_recording()
    }

    pub fn state(&self) -> RecognitionState {
        self.state
    }

    /// `"{project} ({n} classes)"`, or a notice when not initialized.
    pub fn model_info(&self) -> String {
        match self.classifier.properties() {
            Some(props) => props.info(),
            None => "Model not initialized".to_string(),
        }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Result of the most recent cycle; `None` before the first completion
    /// and after the buffer is cleared.
    pub fn last_result(&self) -> Option<&ClassificationResult> {
        self.last_result.as_ref()
    }

    /// Full distribution for the stored buffer.
    ///
    /// Returns the result cached by the last cycle; without one the stored
    /// buffer is classified now (which reports `NO_DATA` or
    /// `MODEL_NOT_INITIALIZED` when there is nothing to classify).
    pub fn detailed_classification(&mut self) -> ClassificationResult {
        match &self.last_result {
            Some(result) => result.clone(),
            None => self.classifier.classify_detailed(self.sampler.audio_data()),
        }
    }

    pub fn detailed_classification_json(&mut self) -> String {
        self.detailed_classification().to_json()
    }

    /// Per-frame features of the stored buffer.
    pub fn extract_features(&self) -> Vec<f32> {
        features::extract(self.sampler.audio_data())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::audio::sampler::StopReason;
    use crate::classify::{MockModule, ModelProperties, NOT_INITIALIZED, NO_DATA};
    use crate::status::RecordingDisplay;

    struct Level(u8);

    impl SoundLevelSource for Level {
        fn sound_level(&mut self) -> u8 {
            self.0
        }
    }

    /// 8 kHz / 100 ms keeps the paused-time runs short: 800 samples.
    fn controller(display: RecordingDisplay) -> PipelineController<Level> {
        let sampler = Sampler::with_rng(Level(200), StdRng::seed_from_u64(3));
        let mut c = PipelineController::new(sampler, Box::new(display));
        c.set_sample_rate(8_000);
        c.set_recording_duration(100);
        c.set_debug_mode(true);
        c
    }

    /// Native classifier whose top score is `labels[top]`.
    fn native_classifier(top: usize) -> Classifier {
        let mut scores = vec![0; 10];
        scores[top] = 42;
        Classifier::resolve(
            Some(Box::new(MockModule::with_scores(scores))),
            ModelProperties::default(),
            HeuristicThresholds::default(),
        )
        .with_seed(9)
    }

    #[test]
    fn start_before_initialize_is_rejected() {
        let display = RecordingDisplay::default();
        let mut c = controller(display.clone());
        assert!(!c.start_recognition());
        assert!(!c.is_recording());
        assert_eq!(display.shown(), vec![STATUS_NOT_INIT]);
        assert_eq!(c.model_info(), "Model not initialized");
    }

    #[test]
    fn rejections_are_silent_without_debug() {
        let display = RecordingDisplay::default();
        let mut c = controller(display.clone());
        c.set_debug_mode(false);
        assert!(!c.start_recognition());
        assert!(display.shown().is_empty());
    }

    #[test]
    fn initialize_with_uninitialized_classifier_fails() {
        let display = RecordingDisplay::default();
        let mut c = controller(display.clone());
        assert!(!c.initialize(Classifier::uninitialized()));
        assert!(!c.is_initialized());
        assert_eq!(display.shown(), vec![STATUS_INIT_ERR]);
    }

    #[test]
    fn configuration_is_forwarded_and_clamped() {
        let mut c = controller(RecordingDisplay::default());
        assert_eq!(c.sample_rate(), 8_000);
        assert_eq!(c.recording_duration_ms(), 100);

        c.set_sample_rate(100_000);
        c.set_recording_duration(50);
        assert_eq!(c.sample_rate(), 8_000);
        assert_eq!(c.recording_duration_ms(), 100);
    }

    #[test]
    fn from_config_applies_settings() {
        let mut config = AppConfig::default();
        config.recognition.sample_rate = 22_050;
        config.recognition.duration_ms = 400;
        config.debug = true;

        let display = RecordingDisplay::default();
        let sampler = Sampler::with_rng(Level(0), StdRng::seed_from_u64(1));
        let mut c = PipelineController::from_config(sampler, Box::new(display.clone()), &config);
        assert_eq!(c.sample_rate(), 22_050);
        assert_eq!(c.recording_duration_ms(), 400);
        c.start_recognition();
        assert_eq!(display.shown(), vec![STATUS_NOT_INIT]);
    }

    #[tokio::test(start_paused = true)]
    async fn full_cycle_produces_fixed_length_buffer() {
        let display = RecordingDisplay::default();
        let mut c = controller(display.clone());
        assert!(c.initialize(native_classifier(1)));
        assert_eq!(c.classifier().backend_name(), Some("native"));
        assert_eq!(c.model_info(), "Voice Recognition Model (10 classes)");

        let recognition = c.recognize().await.expect("completed");
        assert_eq!(recognition.label, "yes");
        assert_eq!(recognition.reason, StopReason::Duration);
        assert_eq!(recognition.len, 800);
        assert!(recognition.captured <= 800);

        assert_eq!(c.recognition_result(), "yes");
        assert_eq!(c.audio_buffer_len(), 800);
        assert_eq!(c.state(), RecognitionState::Completed);
        assert!(!c.is_recording());
        assert_eq!(display.shown(), vec![STATUS_INIT_OK, STATUS_DONE]);
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_while_recording_is_rejected() {
        let display = RecordingDisplay::default();
        let mut c = controller(display.clone());
        c.initialize(native_classifier(2));

        assert!(c.start_recognition());
        assert!(c.is_recording());
        assert_eq!(c.state(), RecognitionState::Recording);
        assert!(!c.start_recognition());

        let recognition = c.run().await.expect("completed");
        assert_eq!(recognition.label, "no");
        assert_eq!(
            display.shown(),
            vec![STATUS_INIT_OK, STATUS_RECORDING, STATUS_DONE]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn run_without_recording_returns_none() {
        let mut c = controller(RecordingDisplay::default());
        c.initialize(native_classifier(0));
        assert!(c.run().await.is_none());
        assert_eq!(c.recognition_result(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn last_registered_handler_wins() {
        let first = Rc::new(RefCell::new(Vec::new()));
        let second = Rc::new(RefCell::new(Vec::new()));

        let mut c = controller(RecordingDisplay::default());
        c.initialize(native_classifier(7));
        {
            let first = Rc::clone(&first);
            c.on_recognition_completed(move |r| first.borrow_mut().push(r.label.clone()));
        }
        {
            let second = Rc::clone(&second);
            c.on_recognition_completed(move |r| second.borrow_mut().push(r.label.clone()));
        }

        c.recognize().await;
        assert!(first.borrow().is_empty());
        assert_eq!(*second.borrow(), vec!["on".to_string()]);

        c.recognize().await;
        assert_eq!(second.borrow().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_yields_short_unpadded_buffer() {
        let mut c = controller(RecordingDisplay::default());
        c.initialize(native_classifier(3));
        assert!(c.start_recognition());

        let handle = c.stop_handle();
        let (recognition, ()) = tokio::join!(c.run(), async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            handle.stop();
        });

        let recognition = recognition.expect("completed");
        assert!(recognition.was_stopped());
        assert!(recognition.captured < 800);
        assert_eq!(recognition.len, recognition.captured);
        assert_eq!(recognition.label, "up");
        assert_eq!(c.audio_buffer_len(), recognition.captured);
    }

    #[tokio::test(start_paused = true)]
    async fn keyword_queries_are_case_insensitive() {
        let mut c = controller(RecordingDisplay::default());
        c.initialize(native_classifier(9));
        c.recognize().await;

        assert!(c.is_keyword("stop"));
        assert!(c.is_keyword("STOP"));
        assert!(!c.is_keyword("sto"));
        assert!(c.contains_text("TO"));
        assert!(!c.contains_text("go"));
    }

    #[tokio::test(start_paused = true)]
    async fn detailed_classification_of_stored_buffer() {
        let mut c = controller(RecordingDisplay::default());
        c.initialize(native_classifier(4));
        c.recognize().await;

        let result = c.detailed_classification();
        assert_eq!(Some(&result), c.last_result());
        assert_eq!(c.detailed_classification(), result);
        assert_eq!(result.label, "down");
        assert_eq!(result.top().map(|(l, _)| l), Some("down"));
        let sum: f64 = result.classification.values().sum();
        assert!((sum - 1.0).abs() < 1e-6);

        let json: serde_json::Value =
            serde_json::from_str(&c.detailed_classification_json()).unwrap();
        assert_eq!(json["label"], "down");
    }

    #[tokio::test(start_paused = true)]
    async fn features_follow_buffer_length() {
        let mut c = controller(RecordingDisplay::default());
        c.initialize(native_classifier(0));
        c.recognize().await;
        // 800 samples: frame 200, hop 100 → 7 frames
        assert_eq!(c.extract_features().len(), 21);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_audio_buffer_returns_to_idle() {
        let mut c = controller(RecordingDisplay::default());
        c.initialize(native_classifier(0));
        c.recognize().await;

        assert!(c.last_result().is_some());
        c.clear_audio_buffer();
        assert!(c.last_result().is_none());
        assert_eq!(c.audio_buffer_len(), 0);
        assert_eq!(c.state(), RecognitionState::Idle);
        assert!(c.extract_features().is_empty());

        let result = c.detailed_classification();
        assert_eq!(result.label, NO_DATA);
        assert!(result.is_error());
    }

    #[test]
    fn detailed_before_initialize_reports_sentinel() {
        let mut c = controller(RecordingDisplay::default());
        assert_eq!(c.detailed_classification().label, NOT_INITIALIZED);
    }
}
