//! Publication seam between the session and the surrounding UI.
//!
//! Trait-based so the core can be driven headless and unit tested without
//! any UI runtime attached.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use mudra_labels::CharacterSetId;
use serde::Serialize;

/// Display-ready classifier verdict for one frame.
///
/// Superseded by the next prediction, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub character: String,
    pub transliteration: Option<String>,
    /// Classifier confidence clamped to [0, 1].
    pub confidence: f32,
    pub character_set: CharacterSetId,
    pub timestamp: DateTime<Utc>,
}

/// Pipeline stage a frame error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FrameStage {
    Capture,
    Classify,
}

/// One publication from the session to its observer.
#[derive(Debug, Clone, Serialize)]
pub enum SessionUpdate {
    /// New prediction fully replacing the previous one.
    Prediction {
        prediction: Prediction,
        suggestions: Vec<String>,
    },
    /// Current prediction withdrawn (e.g. the character set changed).
    Cleared,
    /// Transient capture/classify failure; the pipeline keeps running.
    FrameError { stage: FrameStage, message: String },
}

/// Receives session publications.
///
/// `publish` is called from the frame pipeline and must return promptly;
/// any further asynchronous work belongs to the observer's side of the
/// boundary.
pub trait SessionObserver: Send + Sync {
    fn publish(&self, update: SessionUpdate);
}

/// Type alias for a shared observer reference.
pub type ObserverRef = Arc<dyn SessionObserver>;

/// Observer that records every update for later inspection.
#[derive(Default)]
pub struct InMemoryObserver {
    updates: Mutex<Vec<SessionUpdate>>,
}

impl InMemoryObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<SessionUpdate> {
        self.updates.lock().unwrap().clone()
    }

    pub fn predictions(&self) -> Vec<Prediction> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .filter_map(|u| match u {
                SessionUpdate::Prediction { prediction, .. } => Some(prediction.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_prediction(&self) -> Option<Prediction> {
        self.predictions().pop()
    }

    pub fn frame_errors(&self) -> Vec<String> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .filter_map(|u| match u {
                SessionUpdate::FrameError { message, .. } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.lock().unwrap().is_empty()
    }

    pub fn clear(&self) {
        self.updates.lock().unwrap().clear();
    }
}

impl SessionObserver for InMemoryObserver {
    fn publish(&self, update: SessionUpdate) {
        self.updates.lock().unwrap().push(update);
    }
}

/// Observer that discards all updates.
pub struct NullObserver;

impl SessionObserver for NullObserver {
    fn publish(&self, _update: SessionUpdate) {
        // Intentionally empty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mudra_labels::{CharacterSet, LabelRegistry};
    use std::io::Cursor;

    fn prediction() -> Prediction {
        let registry = LabelRegistry::load(
            Cursor::new("அ(a)\n"),
            vec![CharacterSet::new("Tamil", 0, 1)],
        )
        .unwrap();
        Prediction {
            character: "அ".to_string(),
            transliteration: Some("a".to_string()),
            confidence: 0.9,
            character_set: registry.first_set(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_in_memory_observer_captures_updates() {
        let observer = InMemoryObserver::new();

        observer.publish(SessionUpdate::Prediction {
            prediction: prediction(),
            suggestions: vec!["அம்மா".to_string()],
        });
        observer.publish(SessionUpdate::Cleared);
        observer.publish(SessionUpdate::FrameError {
            stage: FrameStage::Capture,
            message: "lost device".to_string(),
        });

        assert_eq!(observer.len(), 3);
        assert_eq!(observer.predictions().len(), 1);
        assert_eq!(observer.last_prediction().unwrap().character, "அ");
        assert_eq!(observer.frame_errors(), vec!["lost device"]);
    }

    #[test]
    fn test_in_memory_observer_clear() {
        let observer = InMemoryObserver::new();
        observer.publish(SessionUpdate::Cleared);
        assert!(!observer.is_empty());

        observer.clear();
        assert!(observer.is_empty());
    }

    #[test]
    fn test_null_observer_discards() {
        let observer = NullObserver;
        // Should not panic
        observer.publish(SessionUpdate::Cleared);
    }
}
