//! Decoder (shared generator) network for the VAE-GAN
//!
//! The Decoder maps latent vectors to images. A single instance serves both
//! the reconstruction path (latent samples from the encoder) and the pure
//! generation path (latent samples from the prior), sharing all weights.

use tch::{nn, nn::Module, nn::ModuleT, Tensor};

use super::{batch_norm_config, leaky_relu, LEAKY_RELU_SLOPE};

/// Decoder network configuration
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Size of the latent vector
    pub latent_dim: i64,
    /// Number of output channels (3 for RGB)
    pub out_channels: i64,
    /// Height/width of the square output image
    pub image_size: i64,
    /// Channels of the initial projected feature map
    pub decode_channels: i64,
    /// Running-average decay for batch normalization
    pub bn_momentum: f64,
    /// Batch normalization epsilon
    pub bn_eps: f64,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            latent_dim: 128,
            out_channels: 3,
            image_size: 64,
            decode_channels: 256,
            bn_momentum: 0.9,
            bn_eps: 1e-6,
        }
    }
}

/// Decoder network
///
/// Architecture:
/// 1. Dense projection to an 8x8x256 feature map with BatchNorm and LeakyReLU
/// 2. Three ConvTranspose2d blocks with BatchNorm and LeakyReLU (256 -> 128 -> 32),
///    each doubling the resolution
/// 3. Final 5x5 Conv2d to the output channels with Tanh activation
#[derive(Debug)]
pub struct Decoder {
    config: DecoderConfig,
    fc: nn::Linear,
    fc_bn: nn::BatchNorm,
    deconv1: nn::ConvTranspose2D,
    bn1: nn::BatchNorm,
    deconv2: nn::ConvTranspose2D,
    bn2: nn::BatchNorm,
    deconv3: nn::ConvTranspose2D,
    bn3: nn::BatchNorm,
    conv_out: nn::Conv2D,
}

impl Decoder {
    /// Create a new Decoder network
    pub fn new(vs: &nn::Path, config: DecoderConfig) -> Self {
        let channels = config.decode_channels;
        let feature_map = config.image_size / 8;
        let projection_size = channels * feature_map * feature_map;

        let bn = batch_norm_config(config.bn_momentum, config.bn_eps);

        let fc = nn::linear(
            vs / "fc",
            config.latent_dim,
            projection_size,
            Default::default(),
        );
        let fc_bn = nn::batch_norm1d(vs / "fc_bn", projection_size, bn);

        // 5x5 kernels, stride 2, padding 2, output padding 1: each block
        // doubles the resolution
        let deconv_config = nn::ConvTransposeConfig {
            stride: 2,
            padding: 2,
            output_padding: 1,
            ..Default::default()
        };

        let deconv1 = nn::conv_transpose2d(vs / "deconv1", channels, channels, 5, deconv_config);
        let bn1 = nn::batch_norm2d(vs / "bn1", channels, bn);

        let deconv2 =
            nn::conv_transpose2d(vs / "deconv2", channels, channels / 2, 5, deconv_config);
        let bn2 = nn::batch_norm2d(vs / "bn2", channels / 2, bn);

        let deconv3 =
            nn::conv_transpose2d(vs / "deconv3", channels / 2, channels / 8, 5, deconv_config);
        let bn3 = nn::batch_norm2d(vs / "bn3", channels / 8, bn);

        let conv_out_config = nn::ConvConfig {
            stride: 1,
            padding: 2,
            ..Default::default()
        };
        let conv_out = nn::conv2d(
            vs / "conv_out",
            channels / 8,
            config.out_channels,
            5,
            conv_out_config,
        );

        Self {
            config,
            fc,
            fc_bn,
            deconv1,
            bn1,
            deconv2,
            bn2,
            deconv3,
            bn3,
            conv_out,
        }
    }

    /// Decode latent vectors into images
    ///
    /// # Arguments
    ///
    /// * `zs` - Tensor of shape (batch_size, latent_dim)
    /// * `train` - Whether in training mode (affects batch norm)
    ///
    /// # Returns
    ///
    /// Tensor of shape (batch_size, out_channels, image_size, image_size)
    /// with values in [-1, 1] (tanh output).
    pub fn forward_t(&self, zs: &Tensor, train: bool) -> Tensor {
        let batch_size = zs.size()[0];
        let channels = self.config.decode_channels;
        let feature_map = self.config.image_size / 8;

        let x = self.fc.forward(zs);
        let x = self.fc_bn.forward_t(&x, train);
        let x = leaky_relu(&x, LEAKY_RELU_SLOPE);
        let x = x.view([batch_size, channels, feature_map, feature_map]);

        let x = self.deconv1.forward(&x);
        let x = self.bn1.forward_t(&x, train);
        let x = leaky_relu(&x, LEAKY_RELU_SLOPE);

        let x = self.deconv2.forward(&x);
        let x = self.bn2.forward_t(&x, train);
        let x = leaky_relu(&x, LEAKY_RELU_SLOPE);

        let x = self.deconv3.forward(&x);
        let x = self.bn3.forward_t(&x, train);
        let x = leaky_relu(&x, LEAKY_RELU_SLOPE);

        self.conv_out.forward(&x).tanh()
    }

    /// Decode latent vectors (inference mode)
    pub fn generate(&self, zs: &Tensor) -> Tensor {
        self.forward_t(zs, false)
    }

    /// Get configuration
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }
}

impl ModuleT for Decoder {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        Decoder::forward_t(self, xs, train)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{nn::VarStore, Device};

    #[test]
    fn test_decoder_output_shape() {
        let vs = VarStore::new(Device::Cpu);
        let decoder = Decoder::new(&vs.root(), DecoderConfig::default());

        let zs = Tensor::randn([4, 128], (tch::Kind::Float, Device::Cpu));
        let images = decoder.generate(&zs);

        assert_eq!(images.size(), vec![4, 3, 64, 64]);
    }

    #[test]
    fn test_decoder_tanh_range() {
        let vs = VarStore::new(Device::Cpu);
        let decoder = Decoder::new(&vs.root(), DecoderConfig::default());

        for zs in [
            Tensor::zeros([1, 128], (tch::Kind::Float, Device::Cpu)),
            Tensor::randn([4, 128], (tch::Kind::Float, Device::Cpu)),
        ] {
            let images = decoder.generate(&zs);
            let min_val: f64 = images.min().double_value(&[]);
            let max_val: f64 = images.max().double_value(&[]);
            assert!(min_val >= -1.0 && max_val <= 1.0);
        }
    }
}
