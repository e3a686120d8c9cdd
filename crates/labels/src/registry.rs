use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{LabelError, Result};

/// Opaque id of one character set, minted by the registry that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharacterSetId(u16);

/// Named contiguous index range `[start, end)` over the label list.
///
/// The configured sets must partition the label space: sorted by start,
/// gapless from 0, ending exactly at the label count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterSet {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

impl CharacterSet {
    pub fn new(name: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            name: name.into(),
            start,
            end,
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }

    /// Load a character-set table from a JSON array.
    pub fn table_from_json_str(json: &str) -> Result<Vec<CharacterSet>> {
        serde_json::from_str(json)
            .map_err(|e| LabelError::Load(format!("invalid character set table: {e}")))
    }

    pub fn table_from_file(path: impl AsRef<Path>) -> Result<Vec<CharacterSet>> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| LabelError::Load(format!("cannot open {}: {e}", path.display())))?;
        Self::table_from_json_str(&text)
    }
}

/// Ordered classifier label space with index/label maps and character sets.
///
/// Read-only after construction; share as `Arc<LabelRegistry>`.
pub struct LabelRegistry {
    labels: Vec<String>,
    index_by_label: HashMap<String, usize>,
    sets: Vec<CharacterSet>,
}

impl LabelRegistry {
    /// Read newline-separated labels and build the registry.
    ///
    /// Fails if the source is unreadable, contains a blank label, is empty,
    /// or if `sets` does not partition the label index space.
    pub fn load(reader: impl BufRead, sets: Vec<CharacterSet>) -> Result<Self> {
        let mut labels = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line
                .map_err(|e| LabelError::Load(format!("read failed at line {}: {e}", line_no + 1)))?;
            let label = line.trim();
            if label.is_empty() {
                return Err(LabelError::Load(format!("blank label at line {}", line_no + 1)));
            }
            labels.push(label.to_string());
        }
        if labels.is_empty() {
            return Err(LabelError::Load("label source is empty".to_string()));
        }
        validate_partition(&sets, labels.len())?;

        let index_by_label = labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.clone(), i))
            .collect();

        tracing::info!(
            labels = labels.len(),
            sets = sets.len(),
            "label registry loaded"
        );

        Ok(Self {
            labels,
            index_by_label,
            sets,
        })
    }

    pub fn load_file(path: impl AsRef<Path>, sets: Vec<CharacterSet>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| LabelError::Load(format!("cannot open {}: {e}", path.display())))?;
        Self::load(std::io::BufReader::new(file), sets)
    }

    pub fn label_at(&self, index: usize) -> Result<&str> {
        self.labels
            .get(index)
            .map(String::as_str)
            .ok_or(LabelError::OutOfRange {
                index,
                count: self.labels.len(),
            })
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.index_by_label.get(label).copied()
    }

    /// Resolve the character set owning `index`.
    ///
    /// `UnmappedIndex` cannot occur once the partition invariant holds at
    /// load time, but is still checked rather than assumed.
    pub fn character_set_of(&self, index: usize) -> Result<CharacterSetId> {
        if index >= self.labels.len() {
            return Err(LabelError::OutOfRange {
                index,
                count: self.labels.len(),
            });
        }
        self.sets
            .iter()
            .position(|set| set.contains(index))
            .map(|i| CharacterSetId(i as u16))
            .ok_or(LabelError::UnmappedIndex(index))
    }

    pub fn range_of(&self, id: CharacterSetId) -> Option<(usize, usize)> {
        self.sets.get(id.0 as usize).map(|set| (set.start, set.end))
    }

    pub fn set_named(&self, name: &str) -> Option<CharacterSetId> {
        self.sets
            .iter()
            .position(|set| set.name == name)
            .map(|i| CharacterSetId(i as u16))
    }

    pub fn set_name(&self, id: CharacterSetId) -> Option<&str> {
        self.sets.get(id.0 as usize).map(|set| set.name.as_str())
    }

    /// First configured character set; the default scope for a new session.
    pub fn first_set(&self) -> CharacterSetId {
        // Load rejects an empty set table, so index 0 always exists.
        CharacterSetId(0)
    }

    pub fn character_sets(&self) -> impl Iterator<Item = (CharacterSetId, &CharacterSet)> {
        self.sets
            .iter()
            .enumerate()
            .map(|(i, set)| (CharacterSetId(i as u16), set))
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }
}

fn validate_partition(sets: &[CharacterSet], count: usize) -> Result<()> {
    if sets.is_empty() {
        return Err(LabelError::Load("no character sets configured".to_string()));
    }
    let mut expected = 0usize;
    for set in sets {
        if set.start != expected || set.end <= set.start {
            return Err(LabelError::Load(format!(
                "character set '{}' breaks the partition: [{}, {}) where {} was expected",
                set.name, set.start, set.end, expected
            )));
        }
        expected = set.end;
    }
    if expected != count {
        return Err(LabelError::Load(format!(
            "character sets cover [0, {expected}) but {count} labels are loaded"
        )));
    }
    Ok(())
}
