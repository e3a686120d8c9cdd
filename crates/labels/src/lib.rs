mod glyph;
mod registry;

pub use glyph::split_label;
pub use registry::{CharacterSet, CharacterSetId, LabelRegistry};

#[derive(Debug, thiserror::Error)]
pub enum LabelError {
    #[error("label source invalid: {0}")]
    Load(String),
    #[error("label index {index} out of range (count {count})")]
    OutOfRange { index: usize, count: usize },
    #[error("no character set covers index {0}")]
    UnmappedIndex(usize),
}

pub type Result<T> = std::result::Result<T, LabelError>;
