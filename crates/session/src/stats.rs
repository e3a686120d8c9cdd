//! Lock-free session counters, updated from the frame pipeline hot path.

use std::sync::atomic::{AtomicU64, Ordering};

/// Pipeline counters shared via `Arc` and updated without locks.
#[derive(Debug, Default)]
pub struct SessionStats {
    frames_processed: AtomicU64,
    ticks_dropped: AtomicU64,
    frame_errors: AtomicU64,
    stale_discards: AtomicU64,
    source_recoveries: AtomicU64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed.load(Ordering::Relaxed)
    }

    pub fn ticks_dropped(&self) -> u64 {
        self.ticks_dropped.load(Ordering::Relaxed)
    }

    pub fn frame_errors(&self) -> u64 {
        self.frame_errors.load(Ordering::Relaxed)
    }

    pub fn stale_discards(&self) -> u64 {
        self.stale_discards.load(Ordering::Relaxed)
    }

    pub fn source_recoveries(&self) -> u64 {
        self.source_recoveries.load(Ordering::Relaxed)
    }

    pub fn record_frame_processed(&self) {
        self.frames_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped_tick(&self) {
        self.ticks_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_error(&self) {
        self.frame_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_discard(&self) {
        self.stale_discards.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_recovery(&self) {
        self.source_recoveries.fetch_add(1, Ordering::Relaxed);
    }

    /// Create a snapshot for serialization/display.
    pub fn snapshot(&self) -> SessionStatsSnapshot {
        SessionStatsSnapshot {
            frames_processed: self.frames_processed(),
            ticks_dropped: self.ticks_dropped(),
            frame_errors: self.frame_errors(),
            stale_discards: self.stale_discards(),
            source_recoveries: self.source_recoveries(),
        }
    }
}

/// Snapshot of session stats for serialization.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SessionStatsSnapshot {
    pub frames_processed: u64,
    pub ticks_dropped: u64,
    pub frame_errors: u64,
    pub stale_discards: u64,
    pub source_recoveries: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let stats = SessionStats::new();
        stats.record_frame_processed();
        stats.record_frame_processed();
        stats.record_dropped_tick();
        stats.record_frame_error();
        stats.record_stale_discard();
        stats.record_recovery();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.frames_processed, 2);
        assert_eq!(snapshot.ticks_dropped, 1);
        assert_eq!(snapshot.frame_errors, 1);
        assert_eq!(snapshot.stale_discards, 1);
        assert_eq!(snapshot.source_recoveries, 1);
    }
}
