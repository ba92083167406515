//! Dense softmax layer implementation
//!
//! This module provides a DenseSoftmaxLayer (a fully connected layer followed
//! by softmax) that performs: probs = softmax(flatten(input) × weights + biases)

use crate::error::{LayerError, LayerResult};
use crate::layers::Layer;
use crate::utils::activations::{softmax, softmax_jacobian_row};
use crate::utils::tensor::l2_norm;
use crate::utils::{scaled_subtract, SimpleRng, Tensor};

/// Values remembered from the most recent forward pass.
#[derive(Debug, Clone)]
struct ForwardCache {
    input_shape: Vec<usize>,
    input: Vec<f32>,
    totals: Vec<f32>,
}

/// Fully connected layer with softmax activation.
///
/// Accepts an input of any shape holding `input_len` elements and returns a
/// probability vector over `nodes` classes.
///
/// # Fields
///
/// * `input_len` - Number of elements in the flattened input
/// * `nodes` - Number of output classes
/// * `weights` - Weight matrix stored in row-major format (input_len × nodes)
/// * `biases` - Bias vector (nodes)
///
/// # Example
///
/// ```
/// use tiny_cnn::layers::DenseSoftmaxLayer;
/// use tiny_cnn::utils::{SimpleRng, Tensor};
///
/// let mut rng = SimpleRng::new(42);
/// let mut layer = DenseSoftmaxLayer::new(13 * 13 * 8, 10, &mut rng).unwrap();
/// let probs = layer.forward(&Tensor::zeros(&[13, 13, 8])).unwrap();
/// assert_eq!(probs.shape(), &[10]);
/// ```
#[derive(Debug, Clone)]
pub struct DenseSoftmaxLayer {
    input_len: usize,
    nodes: usize,
    weights: Vec<f32>,
    biases: Vec<f32>,
    cache: Option<ForwardCache>,
}

impl DenseSoftmaxLayer {
    /// Create a new layer with random weights and zero biases.
    ///
    /// Weights are standard normal samples divided by `input_len`.
    pub fn new(input_len: usize, nodes: usize, rng: &mut SimpleRng) -> LayerResult<Self> {
        let scale = input_len.max(1) as f32;
        let weights = (0..input_len * nodes)
            .map(|_| rng.gen_normal_f32() / scale)
            .collect();
        Self::with_parameters(input_len, nodes, weights, vec![0.0f32; nodes])
    }

    /// Create a layer from explicit parameters.
    ///
    /// `weights` is `[input_len, nodes]` row-major and `biases` has `nodes` entries.
    pub fn with_parameters(
        input_len: usize,
        nodes: usize,
        weights: Vec<f32>,
        biases: Vec<f32>,
    ) -> LayerResult<Self> {
        if input_len == 0 || nodes == 0 {
            return Err(LayerError::InvalidParameter {
                message: format!(
                    "DenseSoftmaxLayer needs non-zero sizes, got input_len={} nodes={}",
                    input_len, nodes
                ),
            });
        }
        if weights.len() != input_len * nodes {
            return Err(LayerError::LengthMismatch {
                expected: input_len * nodes,
                actual: weights.len(),
            });
        }
        if biases.len() != nodes {
            return Err(LayerError::LengthMismatch {
                expected: nodes,
                actual: biases.len(),
            });
        }

        log::debug!("DenseSoftmaxLayer: {} inputs -> {} nodes", input_len, nodes);

        Ok(Self {
            input_len,
            nodes,
            weights,
            biases,
            cache: None,
        })
    }

    pub fn input_len(&self) -> usize {
        self.input_len
    }

    pub fn nodes(&self) -> usize {
        self.nodes
    }

    /// Weight matrix, `[input_len, nodes]` row-major.
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn biases(&self) -> &[f32] {
        &self.biases
    }

    /// Returns input_len × nodes (weights) + nodes (biases).
    pub fn parameter_count(&self) -> usize {
        self.weights.len() + self.biases.len()
    }

    /// Forward pass.
    ///
    /// Flattens `input`, computes `totals = input · weights + biases` and returns
    /// `softmax(totals)`. The input shape, flattened input and totals are cached
    /// for `backprop`.
    pub fn forward(&mut self, input: &Tensor) -> LayerResult<Tensor> {
        if input.len() != self.input_len {
            return Err(LayerError::LengthMismatch {
                expected: self.input_len,
                actual: input.len(),
            });
        }

        let flat = input.data();
        let mut totals = self.biases.clone();
        for (x, row) in flat.iter().zip(self.weights.chunks_exact(self.nodes)) {
            for (t, w) in totals.iter_mut().zip(row.iter()) {
                *t += x * w;
            }
        }

        let probs = softmax(&totals);

        self.cache = Some(ForwardCache {
            input_shape: input.shape().to_vec(),
            input: flat.to_vec(),
            totals,
        });

        Tensor::from_vec(&[self.nodes], probs)
    }

    /// Backward pass.
    ///
    /// `grad_output` is the loss gradient with respect to the softmax output and
    /// is expected to have exactly one nonzero entry (single-label
    /// cross-entropy). Only the first nonzero entry is used; any later ones are
    /// ignored. With `grad = grad_output[i]`:
    ///
    /// - `dL/dtotals = grad * d(out_i)/d(totals)`
    /// - `dL/dweights = outer(input, dL/dtotals)`
    /// - `dL/dbiases = dL/dtotals`
    /// - `dL/dinput = weights · dL/dtotals`, reshaped to the forward input shape
    ///
    /// Weights and biases are updated in place by `learning_rate`. An all-zero
    /// `grad_output` leaves the parameters untouched and returns a zero gradient.
    pub fn backprop(&mut self, grad_output: &Tensor, learning_rate: f32) -> LayerResult<Tensor> {
        let cache = self.cache.as_ref().ok_or(LayerError::NotYetRun {
            layer: "DenseSoftmaxLayer",
        })?;
        grad_output.expect_shape(&[self.nodes])?;

        let mut nonzero = grad_output
            .data()
            .iter()
            .enumerate()
            .filter(|&(_, &g)| g != 0.0);

        let (i, grad) = match nonzero.next() {
            Some((i, &grad)) => (i, grad),
            None => return Ok(Tensor::zeros(&cache.input_shape)),
        };
        let ignored = nonzero.count();
        if ignored > 0 {
            log::warn!(
                "DenseSoftmaxLayer backprop: {} nonzero gradient entries after index {} ignored",
                ignored,
                i
            );
        }

        let d_l_d_t: Vec<f32> = softmax_jacobian_row(&cache.totals, i)?
            .into_iter()
            .map(|d| grad * d)
            .collect();

        // dL/dinput uses the weights from before this step's update.
        let mut d_l_d_inputs = vec![0.0f32; self.input_len];
        for (d, row) in d_l_d_inputs
            .iter_mut()
            .zip(self.weights.chunks_exact(self.nodes))
        {
            *d = row.iter().zip(d_l_d_t.iter()).map(|(w, g)| w * g).sum();
        }

        let mut d_l_d_w = vec![0.0f32; self.weights.len()];
        for (x, row) in cache.input.iter().zip(d_l_d_w.chunks_exact_mut(self.nodes)) {
            for (dw, g) in row.iter_mut().zip(d_l_d_t.iter()) {
                *dw = x * g;
            }
        }

        let input_shape = cache.input_shape.clone();

        log::trace!(
            "DenseSoftmaxLayer backprop: class={} lr={} |dL/dtotals|={}",
            i,
            learning_rate,
            l2_norm(&d_l_d_t)
        );

        scaled_subtract(&mut self.weights, &d_l_d_w, learning_rate)?;
        scaled_subtract(&mut self.biases, &d_l_d_t, learning_rate)?;

        Tensor::from_vec(&input_shape, d_l_d_inputs)
    }
}

impl Layer for DenseSoftmaxLayer {
    fn forward(&mut self, input: &Tensor) -> LayerResult<Tensor> {
        DenseSoftmaxLayer::forward(self, input)
    }

    fn backprop(
        &mut self,
        grad_output: &Tensor,
        learning_rate: f32,
    ) -> LayerResult<Option<Tensor>> {
        DenseSoftmaxLayer::backprop(self, grad_output, learning_rate).map(Some)
    }

    fn parameter_count(&self) -> usize {
        DenseSoftmaxLayer::parameter_count(self)
    }

    fn name(&self) -> &'static str {
        "DenseSoftmaxLayer"
    }
}
