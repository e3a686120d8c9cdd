//! Recognition session state machine and frame pipeline.
//!
//! A single tokio task owns the video feed and drives frame admission from
//! a fixed-period interval. Classification is the only awaited step and
//! runs in a spawned task so the timer keeps ticking; the `FrameInFlight`
//! state is the sole concurrency guard and admits at most one frame at a
//! time. Staleness (character-set changes, suspend, dispose racing an
//! in-flight frame) is detected with a generation counter checked before
//! publication.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use mudra_labels::{split_label, CharacterSetId, LabelRegistry};
use mudra_lexicon::SuggestionEngine;
use mudra_vision::{Classifier, Frame, VideoFeed, VideoSource};

use crate::observer::{FrameStage, Prediction, SessionObserver, SessionUpdate};
use crate::stats::{SessionStats, SessionStatsSnapshot};
use crate::{Result, SessionError};

/// Tunables for one recognition session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Fixed sampling period driving frame admission.
    pub sample_period: Duration,
    /// Consecutive frame errors tolerated before the source is reopened.
    pub max_consecutive_errors: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_period: Duration::from_millis(500),
            max_consecutive_errors: 5,
        }
    }
}

/// Lifecycle state of a recognition session.
///
/// Owned exclusively by the session; no other component mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    SourceInitializing,
    Streaming,
    FrameInFlight,
    Suspended,
    Disposed,
}

struct Core {
    registry: Arc<LabelRegistry>,
    suggestions: Arc<SuggestionEngine>,
    classifier: Arc<dyn Classifier>,
    observer: Arc<dyn SessionObserver>,
    config: SessionConfig,
    state: Mutex<SessionState>,
    /// Bumped whenever in-flight results must be invalidated: character-set
    /// change, suspend, dispose.
    generation: AtomicU64,
    active_set: Mutex<CharacterSetId>,
    consecutive_errors: AtomicU32,
    recovery_pending: AtomicBool,
    stats: SessionStats,
}

impl Core {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().expect("session state mutex poisoned")
    }

    fn active_set(&self) -> CharacterSetId {
        *self.active_set.lock().expect("active set mutex poisoned")
    }
}

/// The character-recognition session engine.
///
/// Collaborators are injected as shared trait objects; the session is the
/// sole owner of the video feed and of the published prediction state.
pub struct RecognitionSession {
    core: Arc<Core>,
    source: Arc<dyn VideoSource>,
    loop_task: Mutex<Option<JoinHandle<()>>>,
}

impl RecognitionSession {
    pub fn new(
        registry: Arc<LabelRegistry>,
        suggestions: Arc<SuggestionEngine>,
        classifier: Arc<dyn Classifier>,
        source: Arc<dyn VideoSource>,
        observer: Arc<dyn SessionObserver>,
        config: SessionConfig,
    ) -> Self {
        let initial_set = registry.first_set();
        Self {
            core: Arc::new(Core {
                registry,
                suggestions,
                classifier,
                observer,
                config,
                state: Mutex::new(SessionState::Idle),
                generation: AtomicU64::new(0),
                active_set: Mutex::new(initial_set),
                consecutive_errors: AtomicU32::new(0),
                recovery_pending: AtomicBool::new(false),
                stats: SessionStats::new(),
            }),
            source,
            loop_task: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.core.lock_state()
    }

    pub fn active_character_set(&self) -> CharacterSetId {
        self.core.active_set()
    }

    pub fn stats(&self) -> SessionStatsSnapshot {
        self.core.stats.snapshot()
    }

    /// Open the video source and begin sampling.
    ///
    /// Must be called within a tokio runtime. A source failure returns the
    /// session to `Idle` and is reported synchronously; there is no
    /// automatic retry.
    pub fn start(&self) -> Result<()> {
        {
            let mut state = self.core.lock_state();
            match *state {
                SessionState::Disposed => return Err(SessionError::Disposed),
                SessionState::Idle => *state = SessionState::SourceInitializing,
                other => {
                    return Err(SessionError::InvalidState {
                        op: "start",
                        state: other,
                    })
                }
            }
        }
        self.open_and_stream("start")
    }

    /// Pause sampling and release the source. Never waits for an in-flight
    /// frame; its result is discarded when it arrives.
    pub fn suspend(&self) -> Result<()> {
        {
            let mut state = self.core.lock_state();
            match *state {
                SessionState::Disposed => return Err(SessionError::Disposed),
                SessionState::Streaming | SessionState::FrameInFlight => {
                    *state = SessionState::Suspended
                }
                other => {
                    return Err(SessionError::InvalidState {
                        op: "suspend",
                        state: other,
                    })
                }
            }
        }
        self.core.generation.fetch_add(1, Ordering::SeqCst);
        self.stop_loop();
        tracing::info!("session suspended");
        Ok(())
    }

    /// Reopen the source after `suspend()`.
    pub fn resume(&self) -> Result<()> {
        {
            let mut state = self.core.lock_state();
            match *state {
                SessionState::Disposed => return Err(SessionError::Disposed),
                SessionState::Suspended => *state = SessionState::SourceInitializing,
                other => {
                    return Err(SessionError::InvalidState {
                        op: "resume",
                        state: other,
                    })
                }
            }
        }
        self.open_and_stream("resume")
    }

    /// Tear the session down. Terminal and idempotent; every other
    /// lifecycle method afterwards returns `SessionError::Disposed`.
    pub fn dispose(&self) {
        {
            let mut state = self.core.lock_state();
            if *state == SessionState::Disposed {
                return;
            }
            *state = SessionState::Disposed;
        }
        self.core.generation.fetch_add(1, Ordering::SeqCst);
        self.stop_loop();
        tracing::info!("session disposed");
    }

    /// Switch the active character set.
    ///
    /// Synchronous: withdraws the current prediction and invalidates any
    /// frame in flight (its result, captured under the old set, is
    /// discarded rather than published under the wrong script). The timer
    /// and source keep running; the next tick predicts under the new set.
    pub fn change_character_set(&self, set: CharacterSetId) -> Result<()> {
        if self.core.registry.range_of(set).is_none() {
            return Err(SessionError::UnknownCharacterSet);
        }
        if *self.core.lock_state() == SessionState::Disposed {
            return Err(SessionError::Disposed);
        }
        *self
            .core
            .active_set
            .lock()
            .expect("active set mutex poisoned") = set;
        self.core.generation.fetch_add(1, Ordering::SeqCst);
        self.core.observer.publish(SessionUpdate::Cleared);
        tracing::debug!(
            set = self.core.registry.set_name(set).unwrap_or("?"),
            "character set changed"
        );
        Ok(())
    }

    fn open_and_stream(&self, op: &'static str) -> Result<()> {
        tracing::info!(op, "opening video source");
        let feed = match self.source.open() {
            Ok(feed) => feed,
            Err(e) => {
                let mut state = self.core.lock_state();
                if *state == SessionState::SourceInitializing {
                    *state = SessionState::Idle;
                }
                drop(state);
                tracing::warn!(op, error = %e, "video source failed to open");
                return Err(SessionError::Source(e));
            }
        };
        {
            let mut state = self.core.lock_state();
            if *state != SessionState::SourceInitializing {
                // Disposed while the source was opening.
                return Err(SessionError::Disposed);
            }
            *state = SessionState::Streaming;
        }
        self.core.consecutive_errors.store(0, Ordering::SeqCst);
        self.core.recovery_pending.store(false, Ordering::SeqCst);

        let core = Arc::clone(&self.core);
        let source = Arc::clone(&self.source);
        let task = tokio::spawn(run_loop(core, source, feed));
        self.replace_loop(Some(task));
        Ok(())
    }

    fn stop_loop(&self) {
        self.replace_loop(None);
    }

    fn replace_loop(&self, task: Option<JoinHandle<()>>) {
        let mut slot = self.loop_task.lock().expect("loop task mutex poisoned");
        if let Some(old) = std::mem::replace(&mut *slot, task) {
            // The old loop parks at an await point; aborting there drops
            // (closes) its feed without waiting for an in-flight frame.
            old.abort();
        }
    }
}

impl Drop for RecognitionSession {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Timer-driven admission loop. Owns the feed; exits (closing it) as soon
/// as the session leaves the streaming states.
async fn run_loop(core: Arc<Core>, source: Arc<dyn VideoSource>, mut feed: Box<dyn VideoFeed>) {
    let mut interval = tokio::time::interval(core.config.sample_period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        interval.tick().await;

        if core.recovery_pending.swap(false, Ordering::SeqCst) {
            tracing::warn!("error threshold reached, reopening video source");
            drop(feed);
            match source.open() {
                Ok(new_feed) => {
                    feed = new_feed;
                    core.consecutive_errors.store(0, Ordering::SeqCst);
                    core.stats.record_recovery();
                }
                Err(e) => {
                    tracing::error!(error = %e, "video source reopen failed, stopping session");
                    core.observer.publish(SessionUpdate::FrameError {
                        stage: FrameStage::Capture,
                        message: e.to_string(),
                    });
                    let mut state = core.lock_state();
                    if *state == SessionState::Streaming {
                        *state = SessionState::Idle;
                    }
                    return;
                }
            }
        }

        // Admission: at most one frame in flight.
        let (generation, active_set) = {
            let mut state = core.lock_state();
            match *state {
                SessionState::Streaming => *state = SessionState::FrameInFlight,
                SessionState::FrameInFlight => {
                    drop(state);
                    core.stats.record_dropped_tick();
                    tracing::trace!("tick dropped, frame in flight");
                    continue;
                }
                _ => return,
            }
            // Snapshot before capture: an in-flight result is resolved with
            // the character set active when its frame was captured.
            (
                core.generation.load(Ordering::SeqCst),
                core.active_set(),
            )
        };

        let frame = match feed.capture() {
            Ok(frame) => frame,
            Err(e) => {
                restore_streaming(&core);
                report_frame_error(&core, FrameStage::Capture, e.to_string());
                continue;
            }
        };

        let core = Arc::clone(&core);
        tokio::spawn(process_frame(core, frame, generation, active_set));
    }
}

/// Classify one admitted frame and publish its prediction.
async fn process_frame(core: Arc<Core>, frame: Frame, generation: u64, active_set: CharacterSetId) {
    let result = core.classifier.classify(&frame).await;

    // A suspend or dispose that landed mid-flight owns the state now;
    // the result vanishes silently.
    if *core.lock_state() != SessionState::FrameInFlight {
        core.stats.record_stale_discard();
        tracing::debug!(seq = frame.seq, "frame result discarded, session left streaming");
        return;
    }

    let stale = core.generation.load(Ordering::SeqCst) != generation;

    match result {
        Err(_) if stale => core.stats.record_stale_discard(),
        Err(e) => report_frame_error(&core, FrameStage::Classify, e.to_string()),
        Ok(_) if stale => {
            core.stats.record_stale_discard();
            tracing::debug!(
                seq = frame.seq,
                set = core.registry.set_name(active_set).unwrap_or("?"),
                "stale frame result discarded"
            );
        }
        Ok(classification) => publish_prediction(&core, &frame, classification),
    }

    restore_streaming(&core);
}

fn publish_prediction(core: &Core, frame: &Frame, classification: mudra_vision::Classification) {
    // Registry failures here are invariant violations, not environment
    // errors: log and drop the frame, publish nothing.
    let label = match core.registry.label_at(classification.index) {
        Ok(label) => label,
        Err(e) => {
            tracing::error!(index = classification.index, error = %e, "classifier index outside label space");
            return;
        }
    };
    let set = match core.registry.character_set_of(classification.index) {
        Ok(set) => set,
        Err(e) => {
            tracing::error!(index = classification.index, error = %e, "label index unmapped");
            return;
        }
    };

    let (character, transliteration) = split_label(label);
    let suggestions = core.suggestions.suggest(character, set);
    let prediction = Prediction {
        character: character.to_string(),
        transliteration: transliteration.map(str::to_string),
        confidence: classification.confidence.clamp(0.0, 1.0),
        character_set: set,
        timestamp: Utc::now(),
    };

    core.consecutive_errors.store(0, Ordering::SeqCst);
    core.stats.record_frame_processed();
    tracing::debug!(
        seq = frame.seq,
        character = %prediction.character,
        confidence = prediction.confidence,
        suggestions = suggestions.len(),
        "prediction published"
    );
    core.observer.publish(SessionUpdate::Prediction {
        prediction,
        suggestions,
    });
}

/// Complete the frame cycle: `FrameInFlight` back to `Streaming`. A state
/// moved elsewhere in the meantime (suspend, dispose) is left untouched.
fn restore_streaming(core: &Core) {
    let mut state = core.lock_state();
    if *state == SessionState::FrameInFlight {
        *state = SessionState::Streaming;
    }
}

fn report_frame_error(core: &Core, stage: FrameStage, message: String) {
    core.stats.record_frame_error();
    let errors = core.consecutive_errors.fetch_add(1, Ordering::SeqCst) + 1;
    tracing::warn!(?stage, errors, %message, "frame error");
    core.observer.publish(SessionUpdate::FrameError { stage, message });
    if errors >= core.config.max_consecutive_errors {
        // A wedged source gets one forced reopen cycle from the loop task.
        core.recovery_pending.store(true, Ordering::SeqCst);
        core.consecutive_errors.store(0, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::InMemoryObserver;
    use mudra_labels::CharacterSet;
    use mudra_vision::{CaptureError, SourceError, StubClassifier};
    use std::io::Cursor;

    struct FailingSource;

    impl VideoSource for FailingSource {
        fn open(&self) -> std::result::Result<Box<dyn VideoFeed>, SourceError> {
            Err(SourceError::NotFound("no camera".to_string()))
        }
    }

    struct NeverSource;

    impl VideoSource for NeverSource {
        fn open(&self) -> std::result::Result<Box<dyn VideoFeed>, SourceError> {
            Ok(Box::new(NeverFeed))
        }
    }

    struct NeverFeed;

    impl VideoFeed for NeverFeed {
        fn capture(&mut self) -> std::result::Result<Frame, CaptureError> {
            Err(CaptureError::Closed)
        }
    }

    fn registry() -> Arc<LabelRegistry> {
        Arc::new(
            LabelRegistry::load(
                Cursor::new("அ(a)\nஆ(aa)\nA\nB\n"),
                vec![
                    CharacterSet::new("Tamil", 0, 2),
                    CharacterSet::new("English", 2, 4),
                ],
            )
            .unwrap(),
        )
    }

    fn session_with(
        source: Arc<dyn VideoSource>,
        observer: Arc<InMemoryObserver>,
    ) -> RecognitionSession {
        let registry = registry();
        RecognitionSession::new(
            Arc::clone(&registry),
            Arc::new(SuggestionEngine::default()),
            Arc::new(StubClassifier::new(registry.label_count())),
            source,
            observer,
            SessionConfig::default(),
        )
    }

    #[test]
    fn test_source_failure_returns_to_idle() {
        let observer = Arc::new(InMemoryObserver::new());
        let session = session_with(Arc::new(FailingSource), Arc::clone(&observer));

        assert_eq!(session.state(), SessionState::Idle);
        assert!(matches!(session.start(), Err(SessionError::Source(_))));
        assert_eq!(session.state(), SessionState::Idle);

        // Not retried automatically and nothing published.
        assert!(observer.is_empty());
    }

    #[test]
    fn test_lifecycle_guards() {
        let observer = Arc::new(InMemoryObserver::new());
        let session = session_with(Arc::new(FailingSource), Arc::clone(&observer));

        assert!(matches!(
            session.suspend(),
            Err(SessionError::InvalidState { op: "suspend", .. })
        ));
        assert!(matches!(
            session.resume(),
            Err(SessionError::InvalidState { op: "resume", .. })
        ));
    }

    #[test]
    fn test_dispose_is_terminal_and_idempotent() {
        let observer = Arc::new(InMemoryObserver::new());
        let session = session_with(Arc::new(NeverSource), Arc::clone(&observer));

        session.dispose();
        assert_eq!(session.state(), SessionState::Disposed);
        session.dispose();

        assert!(matches!(session.start(), Err(SessionError::Disposed)));
        assert!(matches!(session.suspend(), Err(SessionError::Disposed)));
        assert!(matches!(session.resume(), Err(SessionError::Disposed)));
        let set = session.active_character_set();
        assert!(matches!(
            session.change_character_set(set),
            Err(SessionError::Disposed)
        ));
    }

    #[test]
    fn test_change_character_set_publishes_cleared() {
        let observer = Arc::new(InMemoryObserver::new());
        let session = session_with(Arc::new(NeverSource), Arc::clone(&observer));

        let english = registry().set_named("English").unwrap();
        session.change_character_set(english).unwrap();

        assert_eq!(session.active_character_set(), english);
        let updates = observer.updates();
        assert_eq!(updates.len(), 1);
        assert!(matches!(updates[0], SessionUpdate::Cleared));
    }

    #[test]
    fn test_change_character_set_rejects_foreign_id() {
        let observer = Arc::new(InMemoryObserver::new());
        let session = session_with(Arc::new(NeverSource), Arc::clone(&observer));

        // An id minted by a registry with more sets than the session's.
        let wide = LabelRegistry::load(
            Cursor::new("a\nb\nc\n"),
            vec![
                CharacterSet::new("One", 0, 1),
                CharacterSet::new("Two", 1, 2),
                CharacterSet::new("Three", 2, 3),
            ],
        )
        .unwrap();
        let foreign = wide.set_named("Three").unwrap();

        assert!(matches!(
            session.change_character_set(foreign),
            Err(SessionError::UnknownCharacterSet)
        ));
    }
}
