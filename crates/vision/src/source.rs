use crate::{CaptureError, Frame, SourceError};

/// A camera or other frame producer that can be opened into a live feed.
///
/// Opening is synchronous and may fail (missing device, permission). The
/// session owns at most one feed at a time and reopens through this trait
/// when recovering a wedged source.
pub trait VideoSource: Send + Sync {
    fn open(&self) -> Result<Box<dyn VideoFeed>, SourceError>;
}

/// Live feed handle. Dropping the feed closes the underlying source.
///
/// A capture outstanding when the feed is closed fails with
/// `CaptureError::Closed`; callers discard such results.
pub trait VideoFeed: Send {
    fn capture(&mut self) -> Result<Frame, CaptureError>;
}
