//! Model module containing the VAE-GAN architecture components
//!
//! This module provides:
//! - Encoder network mapping images to latent Gaussian parameters
//! - Latent sampler implementing the reparameterization trick
//! - Decoder network reconstructing images from latent codes
//! - Discriminator network providing realism scores and learned features
//! - VaeGan wrapper wiring the composite training and inference graphs

mod encoder;
mod sampler;
mod decoder;
mod discriminator;
mod vaegan;

pub use encoder::{Encoder, EncoderConfig};
pub use sampler::{sample_latent, sample_prior};
pub use decoder::{Decoder, DecoderConfig};
pub use discriminator::{Discriminator, DiscriminatorConfig};
pub use vaegan::{
    DecoderTrainOutput, DiscriminatorTrainOutput, EncoderTrainOutput, VaeGan, VaeGanConfig,
};

use tch::Tensor;

/// Negative slope shared by every LeakyReLU in the model.
pub(crate) const LEAKY_RELU_SLOPE: f64 = 0.2;

/// LeakyReLU with a configurable negative slope.
///
/// The tensor op fixes the slope at 0.01; `max(x, slope * x)` is equivalent
/// for any slope in (0, 1).
pub(crate) fn leaky_relu(xs: &Tensor, slope: f64) -> Tensor {
    xs.maximum(&(xs * slope))
}

/// BatchNorm configuration from the running-average decay of the statistics.
///
/// `momentum` here is the decay of the running statistics; libtorch expects
/// the weight of the new observation, hence `1 - momentum`.
pub(crate) fn batch_norm_config(momentum: f64, eps: f64) -> tch::nn::BatchNormConfig {
    tch::nn::BatchNormConfig {
        momentum: 1.0 - momentum,
        eps,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{Device, Kind};

    #[test]
    fn test_leaky_relu_slope() {
        let xs = Tensor::from_slice(&[-2.0f32, -0.5, 0.0, 1.0]);
        let ys = leaky_relu(&xs, 0.2);

        let expected = Tensor::from_slice(&[-0.4f32, -0.1, 0.0, 1.0]);
        assert!(ys.allclose(&expected, 1e-6, 1e-6, false));
    }

    #[test]
    fn test_leaky_relu_positive_identity() {
        let xs = Tensor::rand([16], (Kind::Float, Device::Cpu));
        let ys = leaky_relu(&xs, 0.2);
        assert!(ys.allclose(&xs, 1e-6, 1e-6, false));
    }
}
