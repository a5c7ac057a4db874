//! Error types for the custody ledger core.

use thiserror::Error;

/// Core errors raised while encoding, decoding or parsing records.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("decoding error: {0}")]
    Decoding(String),

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("invalid hash: {0}")]
    InvalidHash(String),
}

/// A payload was rejected before anything was hashed or stored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("required field `{0}` is missing")]
    MissingField(String),

    #[error("required field `{0}` is null")]
    NullField(String),

    #[error("field `{0}` must be text")]
    NotText(String),

    #[error("field `{0}` holds a non-finite number")]
    NonFiniteNumber(String),
}

/// Errors from checking a single record against its own hash or its tail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("content mismatch at position {position}: stored self hash does not match recomputed hash")]
    ContentMismatch { position: u64 },

    #[error("broken link at position {position}: link hash does not match predecessor")]
    BrokenLink { position: u64 },

    #[error("out of sequence: expected position {expected}, got {got}")]
    OutOfSequence { expected: u64, got: u64 },

    #[error("malformed record at position {position}: stored row does not decode")]
    Malformed { position: u64 },
}

impl ValidationError {
    /// The position the error refers to.
    pub fn position(&self) -> u64 {
        match self {
            ValidationError::ContentMismatch { position }
            | ValidationError::BrokenLink { position }
            | ValidationError::Malformed { position } => *position,
            ValidationError::OutOfSequence { expected, .. } => *expected,
        }
    }
}
