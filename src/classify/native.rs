//! Model-backed classification through an opaque native module.
//!
//! The module exposes an allocator over its own linear memory, an inference
//! entry point that takes a `(ptr, len)` pair of `f32` samples and returns a
//! pointer to one `i32` score per label, and a property query.
//!
//! ```text
//! malloc(len × 4) ─▶ write_f32 ─▶ run_classifier(ptr, len) ─▶ read_i32(result, labels)
//!        └──────────────────────── free(ptr) (always) ◀──────────────┘
//! ```

use thiserror::Error;

use super::engine::{ClassifierBackend, ClassifyError};
use super::model::ModelProperties;

/// Offset into the module's linear memory.
pub type Ptr = u32;

const F32_BYTES: usize = 4;

// ---------------------------------------------------------------------------
// NativeError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NativeError {
    #[error("allocation of {0} bytes failed")]
    Alloc(usize),

    #[error("memory access out of bounds at {ptr:#x} (+{len} bytes)")]
    OutOfBounds { ptr: Ptr, len: usize },

    #[error("inference entry point failed: {0}")]
    Inference(String),

    #[error("property query failed: {0}")]
    Properties(String),
}

// ---------------------------------------------------------------------------
// NativeModule
// ---------------------------------------------------------------------------

/// The native classifier module as seen from the host.
pub trait NativeModule {
    fn properties(&mut self) -> Result<ModelProperties, NativeError>;

    fn malloc(&mut self, bytes: usize) -> Result<Ptr, NativeError>;

    fn free(&mut self, ptr: Ptr);

    fn write_f32(&mut self, ptr: Ptr, data: &[f32]) -> Result<(), NativeError>;

    fn read_i32(&self, ptr: Ptr, count: usize) -> Result<Vec<i32>, NativeError>;

    /// Run inference over `len` samples at `ptr`; returns the score pointer.
    fn run_classifier(&mut self, ptr: Ptr, len: usize) -> Result<Ptr, NativeError>;
}

impl<M: NativeModule + ?Sized> NativeModule for Box<M> {
    fn properties(&mut self) -> Result<ModelProperties, NativeError> {
        (**self).properties()
    }

    fn malloc(&mut self, bytes: usize) -> Result<Ptr, NativeError> {
        (**self).malloc(bytes)
    }

    fn free(&mut self, ptr: Ptr) {
        (**self).free(ptr)
    }

    fn write_f32(&mut self, ptr: Ptr, data: &[f32]) -> Result<(), NativeError> {
        (**self).write_f32(ptr, data)
    }

    fn read_i32(&self, ptr: Ptr, count: usize) -> Result<Vec<i32>, NativeError> {
        (**self).read_i32(ptr, count)
    }

    fn run_classifier(&mut self, ptr: Ptr, len: usize) -> Result<Ptr, NativeError> {
        (**self).run_classifier(ptr, len)
    }
}

// ---------------------------------------------------------------------------
// NativeBackend
// ---------------------------------------------------------------------------

pub struct NativeBackend<M> {
    module: M,
}

impl<M: NativeModule> NativeBackend<M> {
    pub fn new(module: M) -> Self {
        Self { module }
    }

    pub fn module(&self) -> &M {
        &self.module
    }

    /// Submit `signal` and read back one score per label.
    pub fn scores(&mut self, signal: &[f32], label_count: usize) -> Result<Vec<i32>, ClassifyError> {
        let ptr = self.module.malloc(signal.len() * F32_BYTES)?;
        let scores = self.run_at(ptr, signal, label_count);
        self.module.free(ptr);
        scores
    }

    fn run_at(&mut self, ptr: Ptr, signal: &[f32], label_count: usize) -> Result<Vec<i32>, ClassifyError> {
        self.module.write_f32(ptr, signal)?;
        let result = self.module.run_classifier(ptr, signal.len())?;
        if result == 0 {
            return Err(ClassifyError::Malformed("null result pointer".into()));
        }
        let scores = self.module.read_i32(result, label_count)?;
        if scores.len() != label_count {
            return Err(ClassifyError::Malformed(format!(
                "expected {label_count} scores, got {}",
                scores.len()
            )));
        }
        Ok(scores)
    }
}

/// Index of the first maximum.
fn argmax(scores: &[i32]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, i32)>, (i, &s)| match best {
            Some((_, top)) if s <= top => best,
            _ => Some((i, s)),
        })
        .map(|(i, _)| i)
}

impl<M: NativeModule> ClassifierBackend for NativeBackend<M> {
    fn name(&self) -> &'static str {
        "native"
    }

    fn infer(&mut self, signal: &[f32], props: &ModelProperties) -> Result<String, ClassifyError> {
        let scores = self.scores(signal, props.labels.len())?;
        let index = argmax(&scores)
            .ok_or_else(|| ClassifyError::Malformed("empty score vector".into()))?;
        log::debug!("classifier: native scores {scores:?} → #{index}");
        Ok(props.labels[index].clone())
    }
}

// ---------------------------------------------------------------------------
// MockModule  (test-only)
// ---------------------------------------------------------------------------

/// In-memory module with a bump allocator and canned scores.
#[cfg(test)]
pub struct MockModule {
    memory: Vec<u8>,
    next: usize,
    live: std::collections::HashMap<Ptr, usize>,
    scores: Vec<i32>,
    pub props: Result<ModelProperties, NativeError>,
    pub fail_alloc: bool,
    pub fail_inference: bool,
    pub null_result: bool,
    pub last_input: Vec<f32>,
}

#[cfg(test)]
impl MockModule {
    /// Module that answers every inference with `scores`.
    pub fn with_scores(scores: Vec<i32>) -> Self {
        Self {
            memory: vec![0; 1 << 20],
            // keep 0 as the null pointer
            next: 8,
            live: std::collections::HashMap::new(),
            scores,
            props: Ok(ModelProperties::default()),
            fail_alloc: false,
            fail_inference: false,
            null_result: false,
            last_input: Vec::new(),
        }
    }

    pub fn live_allocations(&self) -> usize {
        self.live.len()
    }

    fn check(&self, ptr: Ptr, len: usize) -> Result<usize, NativeError> {
        let start = ptr as usize;
        if start + len > self.memory.len() {
            return Err(NativeError::OutOfBounds { ptr, len });
        }
        Ok(start)
    }
}

#[cfg(test)]
impl NativeModule for MockModule {
    fn properties(&mut self) -> Result<ModelProperties, NativeError> {
        self.props.clone()
    }

    fn malloc(&mut self, bytes: usize) -> Result<Ptr, NativeError> {
        if self.fail_alloc || self.next + bytes > self.memory.len() {
            return Err(NativeError::Alloc(bytes));
        }
        let ptr = self.next as Ptr;
        self.next += bytes.max(1);
        self.live.insert(ptr, bytes);
        Ok(ptr)
    }

    fn free(&mut self, ptr: Ptr) {
        self.live.remove(&ptr);
        if self.live.is_empty() {
            self.next = 8;
        }
    }

    fn write_f32(&mut self, ptr: Ptr, data: &[f32]) -> Result<(), NativeError> {
        let start = self.check(ptr, data.len() * 4)?;
        for (i, v) in data.iter().enumerate() {
            self.memory[start + i * 4..start + i * 4 + 4].copy_from_slice(&v.to_le_bytes());
        }
        Ok(())
    }

    fn read_i32(&self, ptr: Ptr, count: usize) -> Result<Vec<i32>, NativeError> {
        let start = self.check(ptr, count * 4)?;
        Ok((0..count)
            .map(|i| {
                let at = start + i * 4;
                i32::from_le_bytes([
                    self.memory[at],
                    self.memory[at + 1],
                    self.memory[at + 2],
                    self.memory[at + 3],
                ])
            })
            .collect())
    }

    fn run_classifier(&mut self, ptr: Ptr, len: usize) -> Result<Ptr, NativeError> {
        if self.fail_inference {
            return Err(NativeError::Inference("trap".into()));
        }
        let start = self.check(ptr, len * 4)?;
        self.last_input = (0..len)
            .map(|i| {
                let at = start + i * 4;
                f32::from_le_bytes([
                    self.memory[at],
                    self.memory[at + 1],
                    self.memory[at + 2],
                    self.memory[at + 3],
                ])
            })
            .collect();
        if self.null_result {
            return Ok(0);
        }

        // Scores live at the very end of memory so over-reads fault.
        let bytes = self.scores.len() * 4;
        let result = (self.memory.len() - bytes) as Ptr;
        for (i, s) in self.scores.clone().iter().enumerate() {
            let at = result as usize + i * 4;
            self.memory[at..at + 4].copy_from_slice(&s.to_le_bytes());
        }
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn props() -> ModelProperties {
        ModelProperties::default()
    }

    #[test]
    fn argmax_picks_first_maximum() {
        assert_eq!(argmax(&[1, 5, 5, 2]), Some(1));
        assert_eq!(argmax(&[-3, -1, -2]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn selects_highest_scoring_label() {
        let mut scores = vec![0; 10];
        scores[2] = 90;
        let mut backend = NativeBackend::new(MockModule::with_scores(scores));
        let label = backend.infer(&[0.5; 64], &props()).unwrap();
        assert_eq!(label, "no");
        assert_eq!(backend.module().last_input, vec![0.5; 64]);
    }

    #[test]
    fn allocation_is_always_freed() {
        let mut backend = NativeBackend::new(MockModule::with_scores(vec![1; 10]));
        backend.infer(&[0.0; 16], &props()).unwrap();
        assert_eq!(backend.module().live_allocations(), 0);

        let mut failing = MockModule::with_scores(vec![1; 10]);
        failing.fail_inference = true;
        let mut backend = NativeBackend::new(failing);
        assert!(backend.infer(&[0.0; 16], &props()).is_err());
        assert_eq!(backend.module().live_allocations(), 0);
    }

    #[test]
    fn allocation_failure_is_reported() {
        let mut module = MockModule::with_scores(vec![1; 10]);
        module.fail_alloc = true;
        let err = NativeBackend::new(module).infer(&[0.0; 16], &props()).unwrap_err();
        assert!(matches!(err, ClassifyError::Native(NativeError::Alloc(64))));
    }

    #[test]
    fn short_score_vector_faults() {
        // three scores for a ten-label model: reading ten runs off the end
        let err = NativeBackend::new(MockModule::with_scores(vec![1, 2, 3]))
            .infer(&[0.0; 16], &props())
            .unwrap_err();
        assert!(matches!(err, ClassifyError::Native(NativeError::OutOfBounds { .. })));
    }

    #[test]
    fn null_result_is_malformed() {
        let mut module = MockModule::with_scores(vec![1; 10]);
        module.null_result = true;
        let err = NativeBackend::new(module).infer(&[0.0; 16], &props()).unwrap_err();
        assert!(matches!(err, ClassifyError::Malformed(_)));
    }
}
