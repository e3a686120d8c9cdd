//! Word suggestion lookup: per-character-set seed dictionaries with
//! synonym expansion.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use mudra_labels::CharacterSetId;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum LexiconError {
    #[error("cannot read lexicon {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid lexicon: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LexiconError>;

/// Default cap on the number of suggestions returned per prediction.
pub const DEFAULT_MAX_SUGGESTIONS: usize = 8;

/// Static dictionaries for one character set. Configuration data, never
/// computed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lexicon {
    /// Base character -> example words containing it, in display order.
    #[serde(default)]
    pub seeds: HashMap<String, Vec<String>>,
    /// Seed word -> related words (synonyms, common collocations).
    #[serde(default)]
    pub synonyms: HashMap<String, Vec<String>>,
}

impl Lexicon {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| LexiconError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn seed_words(&self, character: &str) -> Option<&[String]> {
        self.seeds.get(character).map(Vec::as_slice)
    }
}

/// Turns a base character plus active character set into ranked word
/// suggestions.
///
/// Pure with respect to its lexicons: same character + set always yields
/// the same ordered, duplicate-free list.
pub struct SuggestionEngine {
    lexicons: HashMap<CharacterSetId, Lexicon>,
    max_suggestions: usize,
}

impl SuggestionEngine {
    pub fn new(max_suggestions: usize) -> Self {
        Self {
            lexicons: HashMap::new(),
            max_suggestions,
        }
    }

    pub fn with_lexicon(mut self, set: CharacterSetId, lexicon: Lexicon) -> Self {
        self.insert_lexicon(set, lexicon);
        self
    }

    pub fn insert_lexicon(&mut self, set: CharacterSetId, lexicon: Lexicon) {
        tracing::debug!(
            ?set,
            seeds = lexicon.seeds.len(),
            synonyms = lexicon.synonyms.len(),
            "lexicon registered"
        );
        self.lexicons.insert(set, lexicon);
    }

    pub fn has_lexicon(&self, set: CharacterSetId) -> bool {
        self.lexicons.contains_key(&set)
    }

    pub fn max_suggestions(&self) -> usize {
        self.max_suggestions
    }

    /// Ordered, de-duplicated candidate words for `character`.
    ///
    /// Each seed word is followed by its synonym expansion, first-seen
    /// order preserved, truncated to the configured maximum. An unknown
    /// character or a set with no lexicon yields an empty list, not an
    /// error; coverage is allowed to be partial.
    pub fn suggest(&self, character: &str, set: CharacterSetId) -> Vec<String> {
        if character.is_empty() {
            return Vec::new();
        }
        let Some(lexicon) = self.lexicons.get(&set) else {
            tracing::trace!(?set, "no lexicon for character set");
            return Vec::new();
        };
        let Some(seeds) = lexicon.seeds.get(character) else {
            return Vec::new();
        };

        let mut words = Vec::new();
        let mut seen = HashSet::new();
        for seed in seeds {
            push_unique(&mut words, &mut seen, seed);
            if let Some(related) = lexicon.synonyms.get(seed) {
                for word in related {
                    push_unique(&mut words, &mut seen, word);
                }
            }
        }
        words.truncate(self.max_suggestions);
        words
    }
}

impl Default for SuggestionEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SUGGESTIONS)
    }
}

fn push_unique(words: &mut Vec<String>, seen: &mut HashSet<String>, word: &str) {
    if seen.insert(word.to_string()) {
        words.push(word.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mudra_labels::{CharacterSet, LabelRegistry};
    use std::io::Cursor;

    fn set_ids() -> (CharacterSetId, CharacterSetId) {
        let registry = LabelRegistry::load(
            Cursor::new("அ(a)\nஆ(aa)\nA\nB\n"),
            vec![
                CharacterSet::new("Tamil", 0, 2),
                CharacterSet::new("English", 2, 4),
            ],
        )
        .unwrap();
        (
            registry.set_named("Tamil").unwrap(),
            registry.set_named("English").unwrap(),
        )
    }

    fn tamil_lexicon() -> Lexicon {
        Lexicon::from_json_str(
            r#"{
                "seeds": {
                    "அ": ["அம்மா", "அப்பா", "அரசு"]
                },
                "synonyms": {
                    "அம்மா": ["தாய்"],
                    "அப்பா": ["தந்தை", "தாய்"]
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_seed_then_expansion_order() {
        let (tamil, _) = set_ids();
        let engine = SuggestionEngine::default().with_lexicon(tamil, tamil_lexicon());

        let words = engine.suggest("அ", tamil);
        assert_eq!(
            words,
            vec!["அம்மா", "தாய்", "அப்பா", "தந்தை", "அரசு"]
        );
    }

    #[test]
    fn test_deterministic() {
        let (tamil, _) = set_ids();
        let engine = SuggestionEngine::default().with_lexicon(tamil, tamil_lexicon());
        assert_eq!(engine.suggest("அ", tamil), engine.suggest("அ", tamil));
    }

    #[test]
    fn test_no_duplicates() {
        let (tamil, _) = set_ids();
        let engine = SuggestionEngine::default().with_lexicon(tamil, tamil_lexicon());
        let words = engine.suggest("அ", tamil);
        let mut unique = words.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), words.len());
    }

    #[test]
    fn test_truncates_to_max() {
        let (tamil, _) = set_ids();
        let engine = SuggestionEngine::new(2).with_lexicon(tamil, tamil_lexicon());
        assert_eq!(engine.suggest("அ", tamil), vec!["அம்மா", "தாய்"]);
    }

    #[test]
    fn test_empty_character_yields_nothing() {
        let (tamil, _) = set_ids();
        let engine = SuggestionEngine::default().with_lexicon(tamil, tamil_lexicon());
        assert!(engine.suggest("", tamil).is_empty());
    }

    #[test]
    fn test_unknown_character_yields_nothing() {
        let (tamil, _) = set_ids();
        let engine = SuggestionEngine::default().with_lexicon(tamil, tamil_lexicon());
        assert!(engine.suggest("ஔ", tamil).is_empty());
    }

    #[test]
    fn test_unconfigured_set_yields_nothing() {
        let (tamil, english) = set_ids();
        let engine = SuggestionEngine::default().with_lexicon(tamil, tamil_lexicon());
        assert!(!engine.has_lexicon(english));
        assert!(engine.suggest("A", english).is_empty());
    }

    #[test]
    fn test_lexicon_json_defaults() {
        let lexicon = Lexicon::from_json_str(r#"{"seeds": {"A": ["Apple"]}}"#).unwrap();
        assert_eq!(lexicon.seed_words("A").unwrap(), ["Apple"]);
        assert!(lexicon.synonyms.is_empty());
        assert!(Lexicon::from_json_str("not json").is_err());
    }
}
