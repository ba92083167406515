//! Layer-related error types.

use thiserror::Error;

/// Errors that can occur during forward or backward passes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayerError {
    #[error("{layer}: backprop called before any forward pass")]
    NotYetRun { layer: &'static str },

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Rank mismatch: expected a {expected}-D tensor, got {actual}-D")]
    RankMismatch { expected: usize, actual: usize },

    #[error("Length mismatch: expected {expected} elements, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Input of {height}x{width} is smaller than the 3x3 kernel")]
    InputTooSmall { height: usize, width: usize },

    #[error("Label {label} out of range for {classes} classes")]
    InvalidLabel { label: usize, classes: usize },

    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },
}

pub type LayerResult<T> = Result<T, LayerError>;
