//! Error types for latent MI estimation

use thiserror::Error;

/// Errors raised by the estimator, the training loop and the model family
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LmiError {
    #[error("Shape mismatch: X has {x_len} samples, Y has {y_len}")]
    ShapeMismatch { x_len: usize, y_len: usize },

    #[error("Empty input: at least one sample is required")]
    EmptyInput,

    #[error("Ragged input on {side}: row {row} has {got} columns, expected {expected}")]
    RaggedInput {
        side: &'static str,
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Index {index} out of bounds for {len} samples")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Insufficient samples: {n} samples, need more than {k}")]
    InsufficientSamples { n: usize, k: usize },

    #[error("Model state mismatch: {0}")]
    StateMismatch(String),
}

/// Result alias used across the crate
pub type LmiResult<T> = Result<T, LmiError>;
