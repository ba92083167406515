//! Owned row-major tensor used at every layer boundary.
//!
//! Layers store their parameters as flat `Vec<f32>` buffers; a `Tensor` pairs
//! such a buffer with the shape it should be read as.

use crate::error::{LayerError, LayerResult};

/// Dense `f32` tensor in row-major (C) order.
///
/// # Example
///
/// ```
/// use tiny_cnn::utils::Tensor;
///
/// let t = Tensor::from_vec(&[2, 3], vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
/// assert_eq!(t.at(&[1, 2]), Some(5.0));
/// assert_eq!(t.flatten().shape(), &[6]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    /// Create a tensor of the given shape filled with zeros.
    pub fn zeros(shape: &[usize]) -> Self {
        Self::filled(shape, 0.0)
    }

    /// Create a tensor of the given shape filled with `value`.
    pub fn filled(shape: &[usize], value: f32) -> Self {
        let len = shape.iter().product();
        Self {
            shape: shape.to_vec(),
            data: vec![value; len],
        }
    }

    /// Wrap an existing buffer.
    ///
    /// Fails with `LengthMismatch` when `data.len()` is not the product of `shape`.
    pub fn from_vec(shape: &[usize], data: Vec<f32>) -> LayerResult<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(LayerError::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            shape: shape.to_vec(),
            data,
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Reinterpret the buffer with a new shape holding the same element count.
    pub fn reshape(self, shape: &[usize]) -> LayerResult<Self> {
        Self::from_vec(shape, self.data)
    }

    /// Copy into a 1-D tensor, preserving row-major order.
    pub fn flatten(&self) -> Self {
        Self {
            shape: vec![self.data.len()],
            data: self.data.clone(),
        }
    }

    /// Read a single element by multi-dimensional index.
    ///
    /// Returns `None` if `index` has the wrong rank or any coordinate is out of
    /// bounds.
    pub fn at(&self, index: &[usize]) -> Option<f32> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut offset = 0;
        for (&i, &dim) in index.iter().zip(self.shape.iter()) {
            if i >= dim {
                return None;
            }
            offset = offset * dim + i;
        }
        self.data.get(offset).copied()
    }

    /// Ensure this tensor has exactly `expected` as its shape.
    pub(crate) fn expect_shape(&self, expected: &[usize]) -> LayerResult<()> {
        if self.shape != expected {
            return Err(LayerError::ShapeMismatch {
                expected: expected.to_vec(),
                actual: self.shape.clone(),
            });
        }
        Ok(())
    }
}

/// In-place gradient descent step: `params[i] -= scale * grads[i]`.
///
/// Fails without touching `params` if the two slices differ in length.
pub fn scaled_subtract(params: &mut [f32], grads: &[f32], scale: f32) -> LayerResult<()> {
    if params.len() != grads.len() {
        return Err(LayerError::LengthMismatch {
            expected: params.len(),
            actual: grads.len(),
        });
    }

    for (param, grad) in params.iter_mut().zip(grads.iter()) {
        *param -= scale * grad;
    }
    Ok(())
}

/// Euclidean norm, used for trace logging of gradient magnitudes.
pub(crate) fn l2_norm(values: &[f32]) -> f32 {
    values.iter().map(|v| v * v).sum::<f32>().sqrt()
}
