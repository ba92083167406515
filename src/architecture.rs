//! Architecture configuration structures
//!
//! This module provides configuration structures for describing a layer stack
//! via JSON, and the `Network` that chains the built layers for one forward and
//! one backward pass at a time.

use crate::error::LayerResult;
use crate::layers::{ConvolutionLayer, DenseSoftmaxLayer, Layer, MaxPool2Layer};
use crate::utils::activations::{argmax, cross_entropy_gradient, cross_entropy_loss};
use crate::utils::{SimpleRng, Tensor};
use serde::Deserialize;
use std::error::Error;
use std::fs;

/// Configuration for a single layer in the network.
///
/// Defines the layer type and its parameters. Different layer types require different fields:
///
/// - **conv3x3**: Requires `num_filters`; must be the first layer
/// - **maxpool2**: No parameters
/// - **softmax**: Requires `input_len` and `nodes`; must be the last layer
///
/// # Examples
///
/// ```json
/// { "layer_type": "conv3x3", "num_filters": 8 }
/// ```
///
/// ```json
/// { "layer_type": "softmax", "input_len": 1352, "nodes": 10 }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct LayerConfig {
    /// Type of layer: "conv3x3", "maxpool2" or "softmax"
    pub layer_type: String,

    /// Number of 3x3 filters for a conv3x3 layer
    pub num_filters: Option<usize>,

    /// Flattened input length for a softmax layer
    pub input_len: Option<usize>,
    /// Number of output classes for a softmax layer
    pub nodes: Option<usize>,
}

/// Configuration for the entire network.
///
/// `input_height` and `input_width` describe the 2-D image fed to the first layer;
/// layers are applied in the order they appear.
///
/// # Example
///
/// ```json
/// {
///   "input_height": 28,
///   "input_width": 28,
///   "layers": [
///     { "layer_type": "conv3x3", "num_filters": 8 },
///     { "layer_type": "maxpool2" },
///     { "layer_type": "softmax", "input_len": 1352, "nodes": 10 }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ArchitectureConfig {
    pub input_height: usize,
    pub input_width: usize,
    /// Sequence of layer configurations defining the network structure
    pub layers: Vec<LayerConfig>,
}

/// Loads an architecture configuration from a JSON file.
///
/// Reads the file at `path`, deserializes it into an `ArchitectureConfig` and
/// validates that every layer's input matches the previous layer's output.
///
/// # Examples
///
/// ```no_run
/// use tiny_cnn::architecture::load_architecture;
///
/// let arch = load_architecture("config/mnist_cnn.json").unwrap();
/// assert!(!arch.layers.is_empty());
/// ```
pub fn load_architecture(path: &str) -> Result<ArchitectureConfig, Box<dyn Error>> {
    let contents = fs::read_to_string(path)?;
    let config: ArchitectureConfig = serde_json::from_str(&contents)?;
    validate_architecture(&config)?;
    Ok(config)
}

fn invalid(message: String) -> Box<dyn Error> {
    Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message))
}

fn required(
    value: Option<usize>,
    index: usize,
    layer: &str,
    field: &str,
) -> Result<usize, Box<dyn Error>> {
    match value {
        Some(0) => Err(invalid(format!(
            "Layer {}: {} '{}' must be greater than 0",
            index, layer, field
        ))),
        Some(v) => Ok(v),
        None => Err(invalid(format!(
            "Layer {}: {} layer requires '{}'",
            index, layer, field
        ))),
    }
}

/// Output shape of one layer given its input shape.
fn layer_output_shape(
    layer: &LayerConfig,
    index: usize,
    count: usize,
    input: &[usize],
) -> Result<Vec<usize>, Box<dyn Error>> {
    match layer.layer_type.to_lowercase().as_str() {
        "conv3x3" => {
            let num_filters = required(layer.num_filters, index, "Conv3x3", "num_filters")?;
            if index != 0 {
                return Err(invalid(format!(
                    "Layer {}: Conv3x3 must be the first layer (it returns no input gradient)",
                    index
                )));
            }
            match *input {
                [h, w] if h >= 3 && w >= 3 => Ok(vec![h - 2, w - 2, num_filters]),
                _ => Err(invalid(format!(
                    "Layer {}: Conv3x3 needs a 2-D input of at least 3x3, got {:?}",
                    index, input
                ))),
            }
        }
        "maxpool2" => match *input {
            [h, w, c] if h >= 2 && w >= 2 => Ok(vec![h / 2, w / 2, c]),
            _ => Err(invalid(format!(
                "Layer {}: MaxPool2 needs a 3-D input of at least 2x2, got {:?}",
                index, input
            ))),
        },
        "softmax" => {
            let input_len = required(layer.input_len, index, "Softmax", "input_len")?;
            let nodes = required(layer.nodes, index, "Softmax", "nodes")?;
            let incoming: usize = input.iter().product();
            if input_len != incoming {
                return Err(invalid(format!(
                    "Layer connection mismatch: Layer {} input_len ({}) does not match incoming size ({})",
                    index, input_len, incoming
                )));
            }
            if index + 1 != count {
                return Err(invalid(format!(
                    "Layer {}: Softmax must be the last layer",
                    index
                )));
            }
            Ok(vec![nodes])
        }
        _ => Err(invalid(format!(
            "Layer {}: Invalid layer type '{}'. Must be one of: conv3x3, maxpool2, softmax",
            index, layer.layer_type
        ))),
    }
}

/// Validates the architecture configuration.
///
/// Propagates the input shape through every layer, checking required fields,
/// positive sizes and that each layer accepts what the previous one produces.
///
/// # Errors
///
/// Returns an error if validation fails with a descriptive message.
fn validate_architecture(config: &ArchitectureConfig) -> Result<Vec<usize>, Box<dyn Error>> {
    if config.layers.is_empty() {
        return Err(invalid(
            "Architecture must have at least one layer".to_string(),
        ));
    }

    let count = config.layers.len();
    let mut shape = vec![config.input_height, config.input_width];
    for (i, layer) in config.layers.iter().enumerate() {
        shape = layer_output_shape(layer, i, count, &shape)?;
    }

    Ok(shape)
}

/// Builds a network from an architecture configuration.
///
/// Validates the configuration, then creates each layer in order, drawing
/// initial parameters from `rng`.
///
/// # Examples
///
/// ```no_run
/// use tiny_cnn::architecture::{build_model, load_architecture};
/// use tiny_cnn::utils::SimpleRng;
///
/// let config = load_architecture("config/mnist_cnn.json").unwrap();
/// let mut rng = SimpleRng::new(42);
/// let network = build_model(&config, &mut rng).unwrap();
/// assert_eq!(network.len(), config.layers.len());
/// ```
pub fn build_model(
    config: &ArchitectureConfig,
    rng: &mut SimpleRng,
) -> Result<Network, Box<dyn Error>> {
    let output_shape = validate_architecture(config)?;
    let mut layers: Vec<Box<dyn Layer>> = Vec::with_capacity(config.layers.len());

    for (i, layer_config) in config.layers.iter().enumerate() {
        match layer_config.layer_type.to_lowercase().as_str() {
            "conv3x3" => {
                let num_filters = required(layer_config.num_filters, i, "Conv3x3", "num_filters")?;
                layers.push(Box::new(ConvolutionLayer::new(num_filters, rng)?));
            }
            "maxpool2" => layers.push(Box::new(MaxPool2Layer::new())),
            "softmax" => {
                let input_len = required(layer_config.input_len, i, "Softmax", "input_len")?;
                let nodes = required(layer_config.nodes, i, "Softmax", "nodes")?;
                layers.push(Box::new(DenseSoftmaxLayer::new(input_len, nodes, rng)?));
            }
            other => {
                return Err(invalid(format!("Layer {}: Invalid layer type '{}'", i, other)));
            }
        }
    }

    let network = Network::new(layers);
    log::info!(
        "Built network: {}x{} input -> {:?} output, {} layers, {} parameters",
        config.input_height,
        config.input_width,
        output_shape,
        network.len(),
        network.parameter_count()
    );
    Ok(network)
}

/// Result of a single training step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleOutcome {
    /// Cross-entropy loss before the update
    pub loss: f32,
    /// Whether the most probable class matched the label
    pub correct: bool,
}

/// An ordered stack of layers.
///
/// Each layer keeps its own forward cache, so `backprop` must follow the
/// `forward` call whose output produced the gradient.
pub struct Network {
    layers: Vec<Box<dyn Layer>>,
}

impl Network {
    pub fn new(layers: Vec<Box<dyn Layer>>) -> Self {
        Self { layers }
    }

    pub fn layers(&self) -> &[Box<dyn Layer>] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(|l| l.parameter_count()).sum()
    }

    /// Run every layer in order.
    pub fn forward(&mut self, input: &Tensor) -> LayerResult<Tensor> {
        let mut activation = input.clone();
        for layer in self.layers.iter_mut() {
            activation = layer.forward(&activation)?;
        }
        Ok(activation)
    }

    /// Run every layer's backprop in reverse order.
    ///
    /// Stops early when a layer produces no upstream gradient; returns the
    /// gradient with respect to the network input otherwise.
    pub fn backprop(
        &mut self,
        grad_output: &Tensor,
        learning_rate: f32,
    ) -> LayerResult<Option<Tensor>> {
        let mut grad = grad_output.clone();
        for layer in self.layers.iter_mut().rev() {
            match layer.backprop(&grad, learning_rate)? {
                Some(upstream) => grad = upstream,
                None => return Ok(None),
            }
        }
        Ok(Some(grad))
    }

    /// One training step on a single labelled image.
    ///
    /// Forward pass, cross-entropy loss against `label`, then one backward pass
    /// with `learning_rate`. Iterating over a dataset is up to the caller.
    pub fn train_sample(
        &mut self,
        image: &Tensor,
        label: usize,
        learning_rate: f32,
    ) -> LayerResult<SampleOutcome> {
        let probs = self.forward(image)?;
        let loss = cross_entropy_loss(probs.data(), label)?;
        let correct = argmax(probs.data()) == label;

        let grad = Tensor::from_vec(probs.shape(), cross_entropy_gradient(probs.data(), label)?)?;
        self.backprop(&grad, learning_rate)?;

        Ok(SampleOutcome { loss, correct })
    }
}
