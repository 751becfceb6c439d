use std::io;

use thiserror::Error;

/// Result alias used throughout the grove crates
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised while fitting, predicting, saving or loading a model.
///
/// Every error is local to the call that raised it; no model is left in a
/// partially initialized state.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Training data had no rows or no columns
    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    /// Two inputs disagree on a dimension
    #[error("dimension mismatch in {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        /// What was being compared
        what: &'static str,
        /// Size the model or first input implied
        expected: usize,
        /// Size that was actually provided
        got: usize,
    },

    /// A model stream was truncated or structurally invalid
    #[error("corrupt model: {0}")]
    CorruptModel(String),

    /// The underlying reader or writer failed
    #[error("I/O failure: {0}")]
    Io(#[from] io::Error),

    /// Prediction or flattening was requested before `fit`
    #[error("model has not been fitted")]
    NotFitted,

    /// Hyperparameters failed validation or could not be parsed
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
}

impl ModelError {
    /// Builds a `CorruptModel` error from anything printable
    pub fn corrupt<S: Into<String>>(reason: S) -> Self {
        ModelError::CorruptModel(reason.into())
    }

    /// Maps a read failure: a short read means the stream is corrupt, anything
    /// else is surfaced as I/O.
    pub fn from_read(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            ModelError::corrupt("truncated stream")
        } else {
            ModelError::Io(err)
        }
    }
}
