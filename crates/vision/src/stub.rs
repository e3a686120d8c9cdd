use std::sync::Mutex;

use async_trait::async_trait;

use crate::{Classification, Classifier, ClassifyError, Frame};

/// Fallback classifier used when no real model is available.
///
/// Emits a deterministic pseudo-random walk over the label space so the
/// rest of the pipeline can run end to end. Satisfies the same interface
/// as a real model; the session never special-cases it.
pub struct StubClassifier {
    label_count: usize,
    state: Mutex<u64>,
}

impl StubClassifier {
    pub fn new(label_count: usize) -> Self {
        Self::with_seed(label_count, 0x9e3779b97f4a7c15)
    }

    pub fn with_seed(label_count: usize, seed: u64) -> Self {
        Self {
            label_count,
            state: Mutex::new(seed.max(1)),
        }
    }
}

#[async_trait]
impl Classifier for StubClassifier {
    async fn classify(&self, frame: &Frame) -> Result<Classification, ClassifyError> {
        if self.label_count == 0 {
            return Err(ClassifyError::ModelNotLoaded);
        }

        let mut state = self.state.lock().expect("stub classifier state mutex poisoned");
        *state = xorshift(*state);
        let index = (*state % self.label_count as u64) as usize;
        *state = xorshift(*state);
        let confidence = 0.55 + (*state % 45) as f32 / 100.0;

        tracing::trace!(seq = frame.seq, index, confidence, "stub classification");
        Ok(Classification { index, confidence })
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}

fn xorshift(mut x: u64) -> u64 {
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x
}
