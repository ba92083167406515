//! 2x2 max pooling layer
//!
//! Halves the spatial dimensions of a `(height, width, channels)` volume by
//! keeping the largest value in each non-overlapping 2x2 window. It has no
//! learnable parameters; backprop only routes gradients.

use crate::error::{LayerError, LayerResult};
use crate::layers::Layer;
use crate::utils::Tensor;

/// Side length of the pooling window (and its stride).
pub const POOL_SIZE: usize = 2;

/// Non-overlapping 2x2 max pooling.
///
/// An odd trailing row or column is dropped, so the output shape is
/// `(height / 2, width / 2, channels)`.
#[derive(Debug, Clone, Default)]
pub struct MaxPool2Layer {
    last_input: Option<Tensor>,
}

impl MaxPool2Layer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output shape for a `(height, width, channels)` input.
    pub fn output_shape(input_shape: &[usize]) -> LayerResult<[usize; 3]> {
        match *input_shape {
            [height, width, channels] => Ok([height / POOL_SIZE, width / POOL_SIZE, channels]),
            _ => Err(LayerError::RankMismatch {
                expected: 3,
                actual: input_shape.len(),
            }),
        }
    }

    pub fn forward(&mut self, input: &Tensor) -> LayerResult<Tensor> {
        let [out_h, out_w, channels] = Self::output_shape(input.shape())?;
        let in_w = input.shape()[1];
        let data = input.data();

        let mut output = Tensor::zeros(&[out_h, out_w, channels]);
        let out = output.data_mut();

        for i in 0..out_h {
            for j in 0..out_w {
                for c in 0..channels {
                    let mut max = f32::NEG_INFINITY;
                    for (y, x) in window(i, j) {
                        max = max.max(data[(y * in_w + x) * channels + c]);
                    }
                    out[(i * out_w + j) * channels + c] = max;
                }
            }
        }

        self.last_input = Some(input.clone());
        Ok(output)
    }

    /// Route each output gradient to the position(s) holding its window maximum.
    ///
    /// Ties all receive the full gradient. `learning_rate` is unused.
    pub fn backprop(&mut self, grad_output: &Tensor, _learning_rate: f32) -> LayerResult<Tensor> {
        let input = self.last_input.as_ref().ok_or(LayerError::NotYetRun {
            layer: "MaxPool2Layer",
        })?;
        let shape = Self::output_shape(input.shape())?;
        grad_output.expect_shape(&shape)?;

        let [out_h, out_w, channels] = shape;
        let in_w = input.shape()[1];
        let data = input.data();
        let grad = grad_output.data();

        let mut grad_input = Tensor::zeros(input.shape());
        let d_in = grad_input.data_mut();

        for i in 0..out_h {
            for j in 0..out_w {
                for c in 0..channels {
                    let max = window(i, j)
                        .map(|(y, x)| data[(y * in_w + x) * channels + c])
                        .fold(f32::NEG_INFINITY, f32::max);
                    let g = grad[(i * out_w + j) * channels + c];

                    for (y, x) in window(i, j) {
                        let idx = (y * in_w + x) * channels + c;
                        if data[idx] == max {
                            d_in[idx] = g;
                        }
                    }
                }
            }
        }

        Ok(grad_input)
    }
}

impl Layer for MaxPool2Layer {
    fn forward(&mut self, input: &Tensor) -> LayerResult<Tensor> {
        MaxPool2Layer::forward(self, input)
    }

    fn backprop(
        &mut self,
        grad_output: &Tensor,
        learning_rate: f32,
    ) -> LayerResult<Option<Tensor>> {
        MaxPool2Layer::backprop(self, grad_output, learning_rate).map(Some)
    }

    fn parameter_count(&self) -> usize {
        0
    }

    fn name(&self) -> &'static str {
        "MaxPool2Layer"
    }
}

// Input coordinates covered by output cell (i, j).
fn window(i: usize, j: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..POOL_SIZE).flat_map(move |dy| {
        (0..POOL_SIZE).map(move |dx| (i * POOL_SIZE + dy, j * POOL_SIZE + dx))
    })
}
