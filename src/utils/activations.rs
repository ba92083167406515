//! Softmax and cross-entropy helpers
//!
//! This module provides the output-side math shared by the softmax layer and
//! the network training step:
//! - Softmax over a vector of totals
//! - The Jacobian row of one softmax output against every total
//! - Cross-entropy loss and its gradient for a single label

use crate::error::{LayerError, LayerResult};

/// Softmax of `totals`: `exp(t_k) / sum(exp(t))`.
///
/// No max-subtraction is applied, so very large totals overflow to `inf`/`NaN`.
/// Callers that feed reasonably scaled activations never hit this.
pub fn softmax(totals: &[f32]) -> Vec<f32> {
    let exp: Vec<f32> = totals.iter().map(|t| t.exp()).collect();
    let sum: f32 = exp.iter().sum();
    exp.into_iter().map(|e| e / sum).collect()
}

/// Partial derivatives of softmax output `i` with respect to every total.
///
/// With `S = sum(exp(t))`:
/// - `k != i`: `-exp(t_i) * exp(t_k) / S^2`
/// - `k == i`: `exp(t_i) * (S - exp(t_i)) / S^2`
///
/// Fails with `InvalidLabel` if `i` is not a valid output index.
pub fn softmax_jacobian_row(totals: &[f32], i: usize) -> LayerResult<Vec<f32>> {
    check_label(totals, i)?;
    let t_exp: Vec<f32> = totals.iter().map(|t| t.exp()).collect();
    let s: f32 = t_exp.iter().sum();
    let s_squared = s * s;

    let mut row: Vec<f32> = t_exp.iter().map(|&e| -t_exp[i] * e / s_squared).collect();
    row[i] = t_exp[i] * (s - t_exp[i]) / s_squared;
    Ok(row)
}

/// Cross-entropy loss `-ln(probs[label])`.
pub fn cross_entropy_loss(probs: &[f32], label: usize) -> LayerResult<f32> {
    check_label(probs, label)?;
    Ok(-probs[label].ln())
}

/// Gradient of the cross-entropy loss with respect to `probs`.
///
/// Only the `label` entry is nonzero (`-1 / probs[label]`), which is exactly the
/// shape `DenseSoftmaxLayer::backprop` expects.
pub fn cross_entropy_gradient(probs: &[f32], label: usize) -> LayerResult<Vec<f32>> {
    check_label(probs, label)?;
    let mut grad = vec![0.0f32; probs.len()];
    grad[label] = -1.0 / probs[label];
    Ok(grad)
}

/// Index of the largest value (first one on ties). Returns 0 for empty input.
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

fn check_label(probs: &[f32], label: usize) -> LayerResult<()> {
    if label >= probs.len() {
        return Err(LayerError::InvalidLabel {
            label,
            classes: probs.len(),
        });
    }
    Ok(())
}
