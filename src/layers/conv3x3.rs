//! 3x3 convolution layer implementation
//!
//! This module provides a ConvolutionLayer that slides a bank of 3x3 filters
//! over a single-channel image with valid padding and stride 1.

use crate::error::{LayerError, LayerResult};
use crate::layers::Layer;
use crate::utils::tensor::l2_norm;
use crate::utils::{scaled_subtract, SimpleRng, Tensor};

/// Side length of every filter.
pub const KERNEL_SIZE: usize = 3;

const KERNEL_AREA: usize = KERNEL_SIZE * KERNEL_SIZE;

/// A 3x3 patch of the input together with its top-left position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub patch: [f32; KERNEL_AREA],
    pub row: usize,
    pub col: usize,
}

/// Lazily enumerate every 3x3 region of a 2-D `(height, width)` image.
///
/// Positions run row by row over `row in 0..=height-3`, `col in 0..=width-3`.
/// Calling it again restarts the enumeration. Images smaller than 3x3 yield
/// nothing; inputs that are not 2-D are rejected.
pub fn iterate_regions(image: &Tensor) -> LayerResult<impl Iterator<Item = Region> + '_> {
    let (height, width) = image_dims(image)?;
    let data = image.data();
    let out_h = (height + 1).saturating_sub(KERNEL_SIZE);
    let out_w = (width + 1).saturating_sub(KERNEL_SIZE);

    Ok((0..out_h).flat_map(move |row| {
        (0..out_w).map(move |col| {
            let mut patch = [0.0f32; KERNEL_AREA];
            for ky in 0..KERNEL_SIZE {
                let start = (row + ky) * width + col;
                patch[ky * KERNEL_SIZE..(ky + 1) * KERNEL_SIZE]
                    .copy_from_slice(&data[start..start + KERNEL_SIZE]);
            }
            Region { patch, row, col }
        })
    }))
}

/// Convolution layer with a bank of learnable 3x3 filters.
///
/// # Fields
///
/// * `num_filters` - Number of filters (output channels)
/// * `filters` - Filter bank, `[num_filters, 3, 3]` row-major
/// * `last_input` - Input of the most recent forward pass
///
/// # Example
///
/// ```
/// use tiny_cnn::layers::ConvolutionLayer;
/// use tiny_cnn::utils::{SimpleRng, Tensor};
///
/// let mut rng = SimpleRng::new(42);
/// let mut conv = ConvolutionLayer::new(8, &mut rng).unwrap();
/// let out = conv.forward(&Tensor::zeros(&[28, 28])).unwrap();
/// assert_eq!(out.shape(), &[26, 26, 8]);
/// ```
#[derive(Debug, Clone)]
pub struct ConvolutionLayer {
    num_filters: usize,
    filters: Vec<f32>,
    last_input: Option<Tensor>,
}

impl ConvolutionLayer {
    /// Create a new layer with `num_filters` randomly initialized filters.
    ///
    /// Each weight is a standard normal sample divided by 9, which keeps the
    /// variance of early activations small.
    pub fn new(num_filters: usize, rng: &mut SimpleRng) -> LayerResult<Self> {
        let filters = (0..num_filters * KERNEL_AREA)
            .map(|_| rng.gen_normal_f32() / KERNEL_AREA as f32)
            .collect();
        Self::with_filters(num_filters, filters)
    }

    /// Create a layer from an explicit filter bank (`[num_filters, 3, 3]` row-major).
    pub fn with_filters(num_filters: usize, filters: Vec<f32>) -> LayerResult<Self> {
        if num_filters == 0 {
            return Err(LayerError::InvalidParameter {
                message: "ConvolutionLayer needs at least one filter".to_string(),
            });
        }
        if filters.len() != num_filters * KERNEL_AREA {
            return Err(LayerError::LengthMismatch {
                expected: num_filters * KERNEL_AREA,
                actual: filters.len(),
            });
        }

        log::debug!(
            "ConvolutionLayer: {} filters of {}x{}",
            num_filters,
            KERNEL_SIZE,
            KERNEL_SIZE
        );

        Ok(Self {
            num_filters,
            filters,
            last_input: None,
        })
    }

    pub fn num_filters(&self) -> usize {
        self.num_filters
    }

    /// The filter bank, `[num_filters, 3, 3]` row-major.
    pub fn filters(&self) -> &[f32] {
        &self.filters
    }

    pub fn parameter_count(&self) -> usize {
        self.filters.len()
    }

    /// Output shape `(height - 2, width - 2, num_filters)` for an input of `height x width`.
    pub fn output_shape(&self, height: usize, width: usize) -> LayerResult<[usize; 3]> {
        if height < KERNEL_SIZE || width < KERNEL_SIZE {
            return Err(LayerError::InputTooSmall { height, width });
        }
        Ok([
            height - KERNEL_SIZE + 1,
            width - KERNEL_SIZE + 1,
            self.num_filters,
        ])
    }

    /// Forward pass over a 2-D `(height, width)` input.
    ///
    /// Returns a `(height - 2, width - 2, num_filters)` volume where
    /// `out[i, j, f]` is the sum of the 3x3 region at `(i, j)` multiplied
    /// elementwise by filter `f` (correlation, no kernel flip).
    pub fn forward(&mut self, input: &Tensor) -> LayerResult<Tensor> {
        let (height, width) = image_dims(input)?;
        let shape = self.output_shape(height, width)?;
        let out_w = shape[1];

        let mut output = Tensor::zeros(&shape);
        let out = output.data_mut();

        for region in iterate_regions(input)? {
            let base = (region.row * out_w + region.col) * self.num_filters;
            for (f, filter) in self.filters.chunks_exact(KERNEL_AREA).enumerate() {
                out[base + f] = region
                    .patch
                    .iter()
                    .zip(filter.iter())
                    .map(|(x, w)| x * w)
                    .sum();
            }
        }

        self.last_input = Some(input.clone());
        Ok(output)
    }

    /// Loss gradient with respect to the filters, given the gradient for the
    /// last forward output.
    ///
    /// `dL/dfilters[f] = sum over (i, j) of dL/dout[i, j, f] * region(i, j)`.
    pub fn filter_gradient(&self, grad_output: &Tensor) -> LayerResult<Vec<f32>> {
        let input = self.last_input.as_ref().ok_or(LayerError::NotYetRun {
            layer: "ConvolutionLayer",
        })?;
        let (height, width) = image_dims(input)?;
        let shape = self.output_shape(height, width)?;
        grad_output.expect_shape(&shape)?;

        let out_w = shape[1];
        let grad = grad_output.data();
        let mut grad_filters = vec![0.0f32; self.filters.len()];

        for region in iterate_regions(input)? {
            let base = (region.row * out_w + region.col) * self.num_filters;
            for (f, acc) in grad_filters.chunks_exact_mut(KERNEL_AREA).enumerate() {
                let g = grad[base + f];
                for (a, x) in acc.iter_mut().zip(region.patch.iter()) {
                    *a += g * x;
                }
            }
        }

        Ok(grad_filters)
    }

    /// Backward pass: one gradient-descent step on the filters.
    ///
    /// `grad_output` must have the shape of the last forward output. Nothing is
    /// returned because this layer sits first in the network and its input
    /// gradient is never needed.
    pub fn backprop(&mut self, grad_output: &Tensor, learning_rate: f32) -> LayerResult<()> {
        let grad_filters = self.filter_gradient(grad_output)?;

        log::trace!(
            "ConvolutionLayer backprop: lr={} |dL/dfilters|={}",
            learning_rate,
            l2_norm(&grad_filters)
        );

        scaled_subtract(&mut self.filters, &grad_filters, learning_rate)
    }
}

impl Layer for ConvolutionLayer {
    fn forward(&mut self, input: &Tensor) -> LayerResult<Tensor> {
        ConvolutionLayer::forward(self, input)
    }

    fn backprop(
        &mut self,
        grad_output: &Tensor,
        learning_rate: f32,
    ) -> LayerResult<Option<Tensor>> {
        ConvolutionLayer::backprop(self, grad_output, learning_rate)?;
        Ok(None)
    }

    fn parameter_count(&self) -> usize {
        ConvolutionLayer::parameter_count(self)
    }

    fn name(&self) -> &'static str {
        "ConvolutionLayer"
    }
}

fn image_dims(input: &Tensor) -> LayerResult<(usize, usize)> {
    match *input.shape() {
        [height, width] => Ok((height, width)),
        _ => Err(LayerError::RankMismatch {
            expected: 2,
            actual: input.ndim(),
        }),
    }
}
