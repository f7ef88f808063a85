//! Encoder network for the VAE-GAN
//!
//! The Encoder maps an image to the parameters of an approximate posterior
//! N(z_mean, exp(z_log_var) * I) over the latent space. Architecture uses
//! strided 2D convolutions to downsample, a dense bottleneck, and two parallel
//! linear heads for the mean and log-variance vectors.

use tch::{nn, nn::Module, nn::ModuleT, Tensor};

use super::{batch_norm_config, leaky_relu, LEAKY_RELU_SLOPE};

/// Encoder network configuration
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Number of input channels (3 for RGB)
    pub in_channels: i64,
    /// Height/width of the square input image
    pub image_size: i64,
    /// Size of the latent vector
    pub latent_dim: i64,
    /// Filters in the first convolution block
    pub base_filters: i64,
    /// Units in the dense bottleneck
    pub hidden_units: i64,
    /// Running-average decay for batch normalization
    pub bn_momentum: f64,
    /// Batch normalization epsilon
    pub bn_eps: f64,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            in_channels: 3,
            image_size: 64,
            latent_dim: 128,
            base_filters: 64,
            hidden_units: 1024,
            bn_momentum: 0.9,
            bn_eps: 1e-6,
        }
    }
}

/// Encoder network
///
/// Architecture:
/// 1. Three strided Conv2d blocks with BatchNorm and LeakyReLU (64 -> 128 -> 256)
/// 2. Flatten and dense bottleneck with BatchNorm and LeakyReLU
/// 3. Parallel linear heads producing `z_mean` and `z_log_var` (no activation)
///
/// Convolution and dense kernels keep the default Kaiming (He) uniform init.
#[derive(Debug)]
pub struct Encoder {
    config: EncoderConfig,
    conv1: nn::Conv2D,
    bn1: nn::BatchNorm,
    conv2: nn::Conv2D,
    bn2: nn::BatchNorm,
    conv3: nn::Conv2D,
    bn3: nn::BatchNorm,
    fc: nn::Linear,
    fc_bn: nn::BatchNorm,
    z_mean: nn::Linear,
    z_log_var: nn::Linear,
}

impl Encoder {
    /// Create a new Encoder network
    pub fn new(vs: &nn::Path, config: EncoderConfig) -> Self {
        let base = config.base_filters;

        // 5x5 kernels, stride 2, padding 2: each block halves the resolution
        let conv_config = nn::ConvConfig {
            stride: 2,
            padding: 2,
            ..Default::default()
        };
        let bn = batch_norm_config(config.bn_momentum, config.bn_eps);

        let conv1 = nn::conv2d(vs / "conv1", config.in_channels, base, 5, conv_config);
        let bn1 = nn::batch_norm2d(vs / "bn1", base, bn);

        let conv2 = nn::conv2d(vs / "conv2", base, base * 2, 5, conv_config);
        let bn2 = nn::batch_norm2d(vs / "bn2", base * 2, bn);

        let conv3 = nn::conv2d(vs / "conv3", base * 2, base * 4, 5, conv_config);
        let bn3 = nn::batch_norm2d(vs / "bn3", base * 4, bn);

        let feature_map = config.image_size / 8;
        let flat_size = base * 4 * feature_map * feature_map;

        let fc = nn::linear(vs / "fc", flat_size, config.hidden_units, Default::default());
        let fc_bn = nn::batch_norm1d(vs / "fc_bn", config.hidden_units, bn);

        let z_mean = nn::linear(
            vs / "z_mean",
            config.hidden_units,
            config.latent_dim,
            Default::default(),
        );
        let z_log_var = nn::linear(
            vs / "z_log_var",
            config.hidden_units,
            config.latent_dim,
            Default::default(),
        );

        Self {
            config,
            conv1,
            bn1,
            conv2,
            bn2,
            conv3,
            bn3,
            fc,
            fc_bn,
            z_mean,
            z_log_var,
        }
    }

    /// Forward pass
    ///
    /// # Arguments
    ///
    /// * `images` - Tensor of shape (batch_size, channels, height, width)
    /// * `train` - Whether in training mode (affects batch norm)
    ///
    /// # Returns
    ///
    /// Tuple of (`z_mean`, `z_log_var`), each of shape (batch_size, latent_dim).
    /// `z_log_var` is unconstrained; the sampler decodes it via `exp(0.5 * v)`.
    pub fn forward_t(&self, images: &Tensor, train: bool) -> (Tensor, Tensor) {
        let x = self.conv1.forward(images);
        let x = self.bn1.forward_t(&x, train);
        let x = leaky_relu(&x, LEAKY_RELU_SLOPE);

        let x = self.conv2.forward(&x);
        let x = self.bn2.forward_t(&x, train);
        let x = leaky_relu(&x, LEAKY_RELU_SLOPE);

        let x = self.conv3.forward(&x);
        let x = self.bn3.forward_t(&x, train);
        let x = leaky_relu(&x, LEAKY_RELU_SLOPE);

        let batch_size = x.size()[0];
        let x = x.view([batch_size, -1]);

        let x = self.fc.forward(&x);
        let x = self.fc_bn.forward_t(&x, train);
        let x = leaky_relu(&x, LEAKY_RELU_SLOPE);

        (self.z_mean.forward(&x), self.z_log_var.forward(&x))
    }

    /// Encode images (inference mode)
    pub fn encode(&self, images: &Tensor) -> (Tensor, Tensor) {
        self.forward_t(images, false)
    }

    /// Get configuration
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{nn::VarStore, Device};

    #[test]
    fn test_encoder_output_shapes() {
        let vs = VarStore::new(Device::Cpu);
        let encoder = Encoder::new(&vs.root(), EncoderConfig::default());

        let images = Tensor::randn([4, 3, 64, 64], (tch::Kind::Float, Device::Cpu));
        let (z_mean, z_log_var) = encoder.forward_t(&images, false);

        assert_eq!(z_mean.size(), vec![4, 128]);
        assert_eq!(z_log_var.size(), vec![4, 128]);
    }

    #[test]
    fn test_encoder_latent_dim_independent_of_batch() {
        let vs = VarStore::new(Device::Cpu);
        let encoder = Encoder::new(&vs.root(), EncoderConfig::default());

        for batch_size in [1, 2, 7] {
            let images = Tensor::randn([batch_size, 3, 64, 64], (tch::Kind::Float, Device::Cpu));
            let (z_mean, z_log_var) = encoder.encode(&images);
            assert_eq!(z_mean.size(), vec![batch_size, 128]);
            assert_eq!(z_log_var.size(), vec![batch_size, 128]);
        }
    }
}
