mod classifier;
mod frame;
mod source;
mod stub;

pub use classifier::{Classification, Classifier};
pub use frame::Frame;
pub use source::{VideoFeed, VideoSource};
pub use stub::StubClassifier;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("camera not found: {0}")]
    NotFound(String),
    #[error("permission denied")]
    PermissionDenied,
    #[error("source error: {0}")]
    Open(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("source closed")]
    Closed,
    #[error("capture failed: {0}")]
    Failed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("model not loaded")]
    ModelNotLoaded,
    #[error("inference failed: {0}")]
    Inference(String),
}
