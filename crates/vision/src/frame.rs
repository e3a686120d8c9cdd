use std::sync::Arc;

/// One captured video frame.
///
/// Pixel data is shared so a frame can be handed to the classifier without
/// copying.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Monotonic sequence number assigned by the producing feed.
    pub seq: u64,
    /// Capture timestamp in milliseconds (wall clock).
    pub ts_ms: i64,
    pub width: u32,
    pub height: u32,
    /// Packed pixel data.
    pub pixels: Arc<[u8]>,
}

impl Frame {
    pub fn new(
        seq: u64,
        ts_ms: i64,
        width: u32,
        height: u32,
        pixels: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            seq,
            ts_ms,
            width,
            height,
            pixels: pixels.into(),
        }
    }

    pub fn pixel_len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}
