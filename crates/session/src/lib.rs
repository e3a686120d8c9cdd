//! Character-recognition session engine.
//!
//! Owns a live video feed, samples frames on a fixed cadence, classifies
//! each admitted frame, and publishes display-ready predictions plus word
//! suggestions to an observer. At most one frame is ever in flight; ticks
//! arriving while a frame is processing are dropped.

mod observer;
mod sentence;
mod session;
mod stats;

pub use observer::{
    FrameStage, InMemoryObserver, NullObserver, ObserverRef, Prediction, SessionObserver,
    SessionUpdate,
};
pub use sentence::SentenceBuffer;
pub use session::{RecognitionSession, SessionConfig, SessionState};
pub use stats::{SessionStats, SessionStatsSnapshot};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session disposed")]
    Disposed,
    #[error("source error: {0}")]
    Source(#[from] mudra_vision::SourceError),
    #[error("{op} is not valid in state {state:?}")]
    InvalidState {
        op: &'static str,
        state: SessionState,
    },
    #[error("unknown character set")]
    UnknownCharacterSet,
}

pub type Result<T> = std::result::Result<T, SessionError>;
