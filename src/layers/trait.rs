//! Layer trait definition for the network layers
//!
//! This module defines the common interface that lets a `Network` chain
//! layers without knowing their concrete types.

use crate::error::LayerResult;
use crate::utils::Tensor;

/// Core trait for trainable (or pass-through) layers.
///
/// Each layer caches whatever it needs from its most recent `forward` call, so a
/// `backprop` is only meaningful right after a `forward` on the same instance.
///
/// # Example
///
/// ```ignore
/// let out = layer.forward(&input)?;
/// // ... compute the loss gradient for `out` ...
/// let upstream = layer.backprop(&grad_out, 0.005)?;
/// ```
pub trait Layer {
    /// Forward propagation through the layer.
    ///
    /// Computes the layer output and caches the inputs needed by `backprop`.
    fn forward(&mut self, input: &Tensor) -> LayerResult<Tensor>;

    /// Backward propagation through the layer.
    ///
    /// Takes the loss gradient with respect to the last forward output, applies
    /// one gradient-descent step to any parameters, and returns the loss
    /// gradient with respect to the layer input.
    ///
    /// Returns `Ok(None)` when the layer does not produce an upstream gradient
    /// (the first layer of a network).
    fn backprop(&mut self, grad_output: &Tensor, learning_rate: f32)
        -> LayerResult<Option<Tensor>>;

    /// Number of trainable parameters.
    fn parameter_count(&self) -> usize;

    /// Short human-readable layer name, used in logs and errors.
    fn name(&self) -> &'static str;
}
