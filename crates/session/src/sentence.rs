//! Running sentence assembled from accepted characters and words.

use mudra_labels::split_label;

/// Accumulates user-accepted tokens for one playground session.
///
/// Characters collect in a pending buffer until a whole word is accepted;
/// accepting a word supersedes any in-progress character-by-character
/// spelling and clears that buffer.
#[derive(Debug, Clone, Default)]
pub struct SentenceBuffer {
    accepted: String,
    pending: Vec<String>,
}

impl SentenceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_character(&mut self, character: &str) {
        if character.is_empty() {
            return;
        }
        self.pending.push(character.to_string());
    }

    /// Append a raw classifier label, keeping only its character part.
    pub fn append_label(&mut self, label: &str) {
        let (character, _) = split_label(label);
        self.append_character(character);
    }

    pub fn append_word(&mut self, word: &str) {
        if word.is_empty() {
            return;
        }
        self.accepted.push_str(word);
        self.accepted.push(' ');
        self.pending.clear();
    }

    pub fn clear(&mut self) {
        self.accepted.clear();
        self.pending.clear();
    }

    /// Accepted words followed by pending characters, no separator between
    /// the pending characters.
    pub fn render(&self) -> String {
        let mut sentence = self.accepted.clone();
        for character in &self.pending {
            sentence.push_str(character);
        }
        sentence
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty() && self.pending.is_empty()
    }
}
