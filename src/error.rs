//! Error types.
//!
//! Only [`ConfigError`] is fatal. [`InputError`] describes a sentence pair that
//! cannot be aligned; the pipeline skips such pairs and reports them instead of
//! aborting.

use thiserror::Error;

/// Rejected configuration (raised at construction time).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("min_confidence must be within [0, 1], got {0}")]
    InvalidConfidence(f64),
}

/// A malformed sentence or parse tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("sentence has no tokens")]
    Empty,

    #[error("token at position {position} has id {id}, expected {expected}")]
    NonSequentialId { position: usize, id: usize, expected: usize },

    #[error("token {id} points at head {head}, outside 0..={len}")]
    HeadOutOfRange { id: usize, head: usize, len: usize },

    #[error("token {id} is its own head")]
    SelfHead { id: usize },

    #[error("sentence has no root token")]
    NoRoot,

    #[error("malformed tree at byte {offset}: {message}")]
    Tree { offset: usize, message: String },

    #[error("constituency tree has {leaves} leaves but the sentence has {tokens} tokens")]
    LeafMismatch { leaves: usize, tokens: usize },

    #[error("{side} sentence: {source}")]
    Side {
        side: &'static str,
        #[source]
        source: Box<InputError>,
    },
}

impl InputError {
    pub(crate) fn on(self, side: &'static str) -> Self {
        InputError::Side { side, source: Box::new(self) }
    }
}
