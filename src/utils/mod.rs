//! Shared utilities for the layers
//!
//! This module provides tensor storage, random number generation and the
//! softmax/loss helpers used across layers.

pub mod activations;
pub mod rng;
pub mod tensor;

pub use rng::SimpleRng;
pub use tensor::{scaled_subtract, Tensor};
