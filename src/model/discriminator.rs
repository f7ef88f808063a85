//! Discriminator network for the VAE-GAN
//!
//! The Discriminator classifies images as real or generated and additionally
//! exposes an intermediate feature map used as a learned similarity metric.
//! The feature map is captured before the batch normalization and activation
//! of its stage, at 1/8 of the input resolution.

use tch::{nn, nn::Module, nn::ModuleT, Tensor};

use super::{batch_norm_config, leaky_relu, LEAKY_RELU_SLOPE};

/// Discriminator network configuration
#[derive(Debug, Clone)]
pub struct DiscriminatorConfig {
    /// Number of input channels (3 for RGB)
    pub in_channels: i64,
    /// Height/width of the square input image
    pub image_size: i64,
    /// Filters in the first (unnormalized) convolution
    pub base_filters: i64,
    /// Units in the dense classification layer
    pub hidden_units: i64,
    /// Running-average decay for batch normalization
    pub bn_momentum: f64,
    /// Batch normalization epsilon
    pub bn_eps: f64,
}

impl Default for DiscriminatorConfig {
    fn default() -> Self {
        Self {
            in_channels: 3,
            image_size: 64,
            base_filters: 32,
            hidden_units: 512,
            bn_momentum: 0.9,
            bn_eps: 1e-6,
        }
    }
}

/// Discriminator network
///
/// Architecture:
/// 1. Unnormalized 5x5 Conv2d (stride 1) with LeakyReLU
/// 2. Two strided Conv2d blocks with BatchNorm and LeakyReLU (32 -> 128 -> 256)
/// 3. One more strided Conv2d whose pre-normalization activation is the
///    feature output, then BatchNorm and LeakyReLU
/// 4. Flatten, dense layer with BatchNorm and LeakyReLU, final dense to 1
#[derive(Debug)]
pub struct Discriminator {
    config: DiscriminatorConfig,
    conv1: nn::Conv2D,
    conv2: nn::Conv2D,
    bn2: nn::BatchNorm,
    conv3: nn::Conv2D,
    bn3: nn::BatchNorm,
    conv4: nn::Conv2D,
    bn4: nn::BatchNorm,
    fc1: nn::Linear,
    fc_bn: nn::BatchNorm,
    fc2: nn::Linear,
}

impl Discriminator {
    /// Create a new Discriminator network
    pub fn new(vs: &nn::Path, config: DiscriminatorConfig) -> Self {
        let base = config.base_filters;

        let head_config = nn::ConvConfig {
            stride: 1,
            padding: 2,
            ..Default::default()
        };
        let conv_config = nn::ConvConfig {
            stride: 2,
            padding: 2,
            ..Default::default()
        };
        let bn = batch_norm_config(config.bn_momentum, config.bn_eps);

        let conv1 = nn::conv2d(vs / "conv1", config.in_channels, base, 5, head_config);

        let conv2 = nn::conv2d(vs / "conv2", base, base * 4, 5, conv_config);
        let bn2 = nn::batch_norm2d(vs / "bn2", base * 4, bn);

        let conv3 = nn::conv2d(vs / "conv3", base * 4, base * 8, 5, conv_config);
        let bn3 = nn::batch_norm2d(vs / "bn3", base * 8, bn);

        let conv4 = nn::conv2d(vs / "conv4", base * 8, base * 8, 5, conv_config);
        let bn4 = nn::batch_norm2d(vs / "bn4", base * 8, bn);

        let feature_map = config.image_size / 8;
        let flat_size = base * 8 * feature_map * feature_map;

        let fc1 = nn::linear(vs / "fc1", flat_size, config.hidden_units, Default::default());
        let fc_bn = nn::batch_norm1d(vs / "fc_bn", config.hidden_units, bn);
        let fc2 = nn::linear(vs / "fc2", config.hidden_units, 1, Default::default());

        Self {
            config,
            conv1,
            conv2,
            bn2,
            conv3,
            bn3,
            conv4,
            bn4,
            fc1,
            fc_bn,
            fc2,
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
    /// Tuple of:
    /// - realism logits of shape (batch_size, 1); apply sigmoid for a probability
    /// - feature tensor of shape (batch_size, 256, image_size/8, image_size/8),
    ///   taken before the final batch normalization of that stage
    pub fn forward_t(&self, images: &Tensor, train: bool) -> (Tensor, Tensor) {
        let x = self.conv1.forward(images);
        let x = leaky_relu(&x, LEAKY_RELU_SLOPE);

        let x = self.conv2.forward(&x);
        let x = self.bn2.forward_t(&x, train);
        let x = leaky_relu(&x, LEAKY_RELU_SLOPE);

        let x = self.conv3.forward(&x);
        let x = self.bn3.forward_t(&x, train);
        let x = leaky_relu(&x, LEAKY_RELU_SLOPE);

        let features = self.conv4.forward(&x);

        let x = self.bn4.forward_t(&features, train);
        let x = leaky_relu(&x, LEAKY_RELU_SLOPE);

        let batch_size = x.size()[0];
        let x = x.view([batch_size, -1]);

        let x = self.fc1.forward(&x);
        let x = self.fc_bn.forward_t(&x, train);
        let x = leaky_relu(&x, LEAKY_RELU_SLOPE);

        (self.fc2.forward(&x), features)
    }

    /// Classify images (inference mode)
    ///
    /// Returns probability of being real (after sigmoid)
    pub fn classify(&self, images: &Tensor) -> Tensor {
        let (logits, _) = self.forward_t(images, false);
        logits.sigmoid()
    }

    /// Number of channels in the feature output
    pub fn feature_channels(&self) -> i64 {
        self.config.base_filters * 8
    }

    /// Get configuration
    pub fn config(&self) -> &DiscriminatorConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{nn::VarStore, Device};

    #[test]
    fn test_discriminator_output_shapes() {
        let vs = VarStore::new(Device::Cpu);
        let disc = Discriminator::new(&vs.root(), DiscriminatorConfig::default());

        let images = Tensor::randn([4, 3, 64, 64], (tch::Kind::Float, Device::Cpu));
        let (logits, features) = disc.forward_t(&images, false);

        assert_eq!(logits.size(), vec![4, 1]);
        assert_eq!(features.size(), vec![4, 256, 8, 8]);
    }

    #[test]
    fn test_discriminator_classify() {
        let vs = VarStore::new(Device::Cpu);
        let disc = Discriminator::new(&vs.root(), DiscriminatorConfig::default());

        let images = Tensor::randn([2, 3, 64, 64], (tch::Kind::Float, Device::Cpu));
        let probs = disc.classify(&images);

        let min_val: f64 = probs.min().double_value(&[]);
        let max_val: f64 = probs.max().double_value(&[]);
        assert!(min_val >= 0.0 && max_val <= 1.0);
    }
}
