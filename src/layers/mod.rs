//! Layer abstractions for the network
//!
//! This module provides the Layer trait and the layer types that make up the
//! classifier: a 3x3 convolution, 2x2 max pooling and a dense softmax output.

mod r#trait;
pub mod conv3x3;
pub mod maxpool;
pub mod softmax;

// Re-export the Layer trait for convenience
pub use conv3x3::ConvolutionLayer;
pub use maxpool::MaxPool2Layer;
pub use r#trait::Layer;
pub use softmax::DenseSoftmaxLayer;
