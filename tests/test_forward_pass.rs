// Tests for forward propagation: output shapes and known values.

use approx::assert_relative_eq;
use tiny_cnn::layers::{ConvolutionLayer, DenseSoftmaxLayer, MaxPool2Layer};
use tiny_cnn::utils::{SimpleRng, Tensor};
use tiny_cnn::LayerError;

fn ramp(shape: &[usize], scale: f32) -> Tensor {
    let len: usize = shape.iter().product();
    let data = (0..len).map(|v| (v as f32 * 0.37).sin() * scale).collect();
    Tensor::from_vec(shape, data).unwrap()
}

// ============================================================================
// ConvolutionLayer
// ============================================================================

mod convolution_tests {
    use super::*;

    #[test]
    fn test_forward_output_shape() {
        let mut rng = SimpleRng::new(42);
        for &(h, w, f) in &[(3, 3, 1), (5, 5, 1), (28, 28, 8), (4, 9, 3), (10, 3, 2)] {
            let mut conv = ConvolutionLayer::new(f, &mut rng).unwrap();
            let out = conv.forward(&Tensor::zeros(&[h, w])).unwrap();
            assert_eq!(out.shape(), &[h - 2, w - 2, f]);
        }
    }

    #[test]
    fn test_forward_all_ones_filter() {
        // filter = ones / 9 over an all-ones 5x5 image gives exactly 1.0 everywhere.
        let mut conv = ConvolutionLayer::with_filters(1, vec![1.0 / 9.0; 9]).unwrap();
        let out = conv.forward(&Tensor::filled(&[5, 5], 1.0)).unwrap();

        assert_eq!(out.shape(), &[3, 3, 1]);
        for &v in out.data() {
            assert_relative_eq!(v, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_forward_is_correlation_not_convolution() {
        // A filter with a single 1 at the top-left picks the top-left pixel of
        // each region; a flipped kernel would pick the bottom-right instead.
        let mut filter = vec![0.0; 9];
        filter[0] = 1.0;
        let mut conv = ConvolutionLayer::with_filters(1, filter).unwrap();

        let image = Tensor::from_vec(&[3, 4], (0..12).map(|v| v as f32).collect()).unwrap();
        let out = conv.forward(&image).unwrap();

        assert_eq!(out.shape(), &[1, 2, 1]);
        assert_eq!(out.data(), &[0.0, 1.0]);
    }

    #[test]
    fn test_forward_filters_in_last_axis() {
        // filter 0 sums the region, filter 1 takes the centre pixel.
        let mut filters = vec![1.0; 9];
        let mut centre = vec![0.0; 9];
        centre[4] = 1.0;
        filters.extend(centre);
        let mut conv = ConvolutionLayer::with_filters(2, filters).unwrap();

        let image = Tensor::from_vec(&[4, 3], (1..=12).map(|v| v as f32).collect()).unwrap();
        let out = conv.forward(&image).unwrap();

        assert_eq!(out.shape(), &[2, 1, 2]);
        assert_relative_eq!(out.at(&[0, 0, 0]).unwrap(), 45.0);
        assert_relative_eq!(out.at(&[0, 0, 1]).unwrap(), 5.0);
        assert_relative_eq!(out.at(&[1, 0, 0]).unwrap(), 72.0);
        assert_relative_eq!(out.at(&[1, 0, 1]).unwrap(), 8.0);
    }

    #[test]
    fn test_forward_matches_direct_sum() {
        let mut rng = SimpleRng::new(9);
        let mut conv = ConvolutionLayer::new(3, &mut rng).unwrap();
        let image = ramp(&[6, 7], 1.0);
        let out = conv.forward(&image).unwrap();
        let filters = conv.filters().to_vec();

        for i in 0..4 {
            for j in 0..5 {
                for f in 0..3 {
                    let mut expected = 0.0f32;
                    for ky in 0..3 {
                        for kx in 0..3 {
                            let pixel = image.at(&[i + ky, j + kx]).unwrap();
                            expected += pixel * filters[f * 9 + ky * 3 + kx];
                        }
                    }
                    assert_relative_eq!(out.at(&[i, j, f]).unwrap(), expected, epsilon = 1e-5);
                }
            }
        }
    }

    #[test]
    fn test_forward_input_too_small() {
        let mut rng = SimpleRng::new(1);
        let mut conv = ConvolutionLayer::new(2, &mut rng).unwrap();
        assert_eq!(
            conv.forward(&Tensor::zeros(&[2, 5])).unwrap_err(),
            LayerError::InputTooSmall {
                height: 2,
                width: 5
            }
        );
    }

    #[test]
    fn test_forward_deterministic_with_seed() {
        let image = ramp(&[8, 8], 0.5);

        let mut rng1 = SimpleRng::new(2024);
        let mut conv1 = ConvolutionLayer::new(4, &mut rng1).unwrap();
        let mut rng2 = SimpleRng::new(2024);
        let mut conv2 = ConvolutionLayer::new(4, &mut rng2).unwrap();

        assert_eq!(conv1.forward(&image).unwrap(), conv2.forward(&image).unwrap());
    }
}

// ============================================================================
// DenseSoftmaxLayer
// ============================================================================

mod softmax_tests {
    use super::*;

    #[test]
    fn test_forward_identity_zero_input() {
        let mut layer = DenseSoftmaxLayer::with_parameters(
            2,
            2,
            vec![1.0, 0.0, 0.0, 1.0],
            vec![0.0, 0.0],
        )
        .unwrap();
        let probs = layer.forward(&Tensor::zeros(&[2])).unwrap();

        assert_eq!(probs.shape(), &[2]);
        assert_relative_eq!(probs.data()[0], 0.5);
        assert_relative_eq!(probs.data()[1], 0.5);
    }

    #[test]
    fn test_forward_probabilities_sum_to_one() {
        let mut rng = SimpleRng::new(42);
        for &(shape, nodes) in &[(&[13usize, 13, 8][..], 10), (&[20][..], 3), (&[2, 3][..], 7)] {
            let len: usize = shape.iter().product();
            let mut layer = DenseSoftmaxLayer::new(len, nodes, &mut rng).unwrap();

            for scale in [0.0f32, 0.5, 3.0] {
                let probs = layer.forward(&ramp(shape, scale)).unwrap();
                assert_eq!(probs.len(), nodes);
                assert!(probs.data().iter().all(|&p| p >= 0.0));
                let sum: f32 = probs.data().iter().sum();
                assert_relative_eq!(sum, 1.0, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_forward_accepts_any_shape() {
        let mut rng = SimpleRng::new(5);
        let mut layer = DenseSoftmaxLayer::new(12, 4, &mut rng).unwrap();
        let flat = ramp(&[12], 1.0);

        let from_flat = layer.forward(&flat).unwrap();
        let from_3d = layer.forward(&flat.clone().reshape(&[2, 3, 2]).unwrap()).unwrap();
        assert_eq!(from_flat, from_3d);
    }

    #[test]
    fn test_forward_bias_shifts_probability() {
        let mut layer =
            DenseSoftmaxLayer::with_parameters(1, 2, vec![0.0, 0.0], vec![2.0f32.ln(), 0.0])
                .unwrap();
        let probs = layer.forward(&Tensor::filled(&[1], 3.0)).unwrap();

        // exp(ln 2) = 2, exp(0) = 1
        assert_relative_eq!(probs.data()[0], 2.0 / 3.0, epsilon = 1e-6);
        assert_relative_eq!(probs.data()[1], 1.0 / 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_forward_wrong_length() {
        let mut rng = SimpleRng::new(5);
        let mut layer = DenseSoftmaxLayer::new(12, 4, &mut rng).unwrap();
        assert!(matches!(
            layer.forward(&Tensor::zeros(&[3, 3])),
            Err(LayerError::LengthMismatch {
                expected: 12,
                actual: 9
            })
        ));
    }

    #[test]
    fn test_forward_zero_input_times_inf_weight_is_nan() {
        // IEEE: 0 * inf = NaN, and the NaN total poisons the whole softmax.
        let weights = vec![f32::INFINITY, 0.0, 0.0, 0.0];
        let mut layer = DenseSoftmaxLayer::with_parameters(2, 2, weights, vec![0.0; 2]).unwrap();

        let probs = layer
            .forward(&Tensor::from_vec(&[2], vec![0.0, 1.0]).unwrap())
            .unwrap();
        assert!(probs.data().iter().all(|p| p.is_nan()));
    }

    #[test]
    fn test_forward_deterministic_with_seed() {
        let input = ramp(&[4, 4, 2], 1.0);

        let mut rng1 = SimpleRng::new(77);
        let mut a = DenseSoftmaxLayer::new(32, 5, &mut rng1).unwrap();
        let mut rng2 = SimpleRng::new(77);
        let mut b = DenseSoftmaxLayer::new(32, 5, &mut rng2).unwrap();

        assert_eq!(a.forward(&input).unwrap(), b.forward(&input).unwrap());
    }
}

// ============================================================================
// Chained forward pass
// ============================================================================

mod pipeline_tests {
    use super::*;

    #[test]
    fn test_conv_pool_softmax_shapes() {
        let mut rng = SimpleRng::new(42);
        let mut conv = ConvolutionLayer::new(8, &mut rng).unwrap();
        let mut pool = MaxPool2Layer::new();
        let mut softmax = DenseSoftmaxLayer::new(13 * 13 * 8, 10, &mut rng).unwrap();

        let image = ramp(&[28, 28], 0.5);
        let conv_out = conv.forward(&image).unwrap();
        assert_eq!(conv_out.shape(), &[26, 26, 8]);

        let pooled = pool.forward(&conv_out).unwrap();
        assert_eq!(pooled.shape(), &[13, 13, 8]);

        let probs = softmax.forward(&pooled).unwrap();
        assert_eq!(probs.shape(), &[10]);
        let sum: f32 = probs.data().iter().sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-5);
    }
}
