//! Tiny CNN layers with manual backpropagation
//!
//! This library provides two trainable layers of a small convolutional network,
//! a 3x3 convolution and a fully-connected softmax classifier, plus the pieces
//! needed to chain them together.
//!
//! # Modules
//!
//! - `layers`: Layer trait and implementations (ConvolutionLayer, MaxPool2Layer, DenseSoftmaxLayer)
//! - `utils`: Shared utilities (tensor storage, RNG, softmax and loss functions)
//! - `config`: Training configuration structures
//! - `architecture`: Architecture configuration and network building
//! - `error`: Error type shared by every layer operation

pub mod architecture;
pub mod config;
pub mod error;
pub mod layers;
pub mod utils;

pub use error::{LayerError, LayerResult};
