use async_trait::async_trait;

use crate::{ClassifyError, Frame};

/// One classifier verdict: an index into the label space plus confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub index: usize,
    /// Model confidence in [0, 1].
    pub confidence: f32,
}

/// Opaque character classifier.
///
/// Inference is the one pipeline step with real latency (tens to hundreds
/// of milliseconds), so `classify` is async; everything else in the frame
/// pipeline completes synchronously.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, frame: &Frame) -> Result<Classification, ClassifyError>;

    fn model_name(&self) -> &str;
}
