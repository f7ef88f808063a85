//! VAE-GAN wrapper combining Encoder, Decoder and Discriminator
//!
//! The three networks are instantiated exactly once; every composite graph
//! below reuses the same instances, so no trainable weights are duplicated.
//! Each network lives in its own variable store, which is what lets an
//! optimizer built over one store update only that network.

use tch::{nn, nn::VarStore, Device, Tensor};

use super::decoder::{Decoder, DecoderConfig};
use super::discriminator::{Discriminator, DiscriminatorConfig};
use super::encoder::{Encoder, EncoderConfig};
use super::sampler::sample_latent;
use crate::training::losses::{kl_divergence, mean_gaussian_negative_log_likelihood};

/// VAE-GAN hyperparameters
#[derive(Debug, Clone)]
pub struct VaeGanConfig {
    /// Size of the latent vector
    pub latent_dim: i64,
    /// Height/width of the square images
    pub image_size: i64,
    /// Number of image channels
    pub image_channels: i64,
    /// Relative weight of the feature-similarity loss against the adversarial
    /// loss in the decoder objective. Must lie in (0, 1) exclusive.
    pub recon_vs_gan_weight: f64,
    /// L2 weight decay applied through the optimizers
    pub weight_decay: f64,
    /// Running-average decay for batch normalization
    pub bn_momentum: f64,
    /// Batch normalization epsilon
    pub bn_eps: f64,
}

impl Default for VaeGanConfig {
    fn default() -> Self {
        Self {
            latent_dim: 128,
            image_size: 64,
            image_channels: 3,
            recon_vs_gan_weight: 1e-6,
            weight_decay: 1e-5,
            bn_momentum: 0.9,
            bn_eps: 1e-6,
        }
    }
}

impl VaeGanConfig {
    /// Similarity-loss scale for the decoder objective:
    /// `recon_vs_gan_weight / (1 - recon_vs_gan_weight)`.
    ///
    /// A weight of exactly 1 divides by zero; the precondition is on the
    /// caller (`Config::validate` rejects it on the CLI surface).
    pub fn normalized_recon_weight(&self) -> f64 {
        self.recon_vs_gan_weight / (1.0 - self.recon_vs_gan_weight)
    }
}

/// Output of the encoder training graph: image -> reconstruction features,
/// with the KL and feature-similarity losses bound to it
#[derive(Debug)]
pub struct EncoderTrainOutput {
    /// Discriminator features of the reconstruction, shape (batch, 256, 8, 8)
    pub recon_features: Tensor,
    /// KL divergence between the posterior and the standard normal prior
    pub kl_loss: Tensor,
    /// Gaussian NLL between real and reconstruction features
    pub similarity_loss: Tensor,
}

impl EncoderTrainOutput {
    /// Combined encoder objective
    pub fn total_loss(&self) -> Tensor {
        &self.kl_loss + &self.similarity_loss
    }
}

/// Output of the decoder training graph: (image, prior sample) ->
/// (reconstruction score, generation score), with the scaled similarity loss
/// bound to it
#[derive(Debug)]
pub struct DecoderTrainOutput {
    /// Realism logits of the reconstruction, shape (batch, 1)
    pub recon_logits: Tensor,
    /// Realism logits of the pure generation, shape (batch, 1)
    pub gen_logits: Tensor,
    /// Gaussian NLL between real and reconstruction features
    pub similarity_loss: Tensor,
    /// Similarity loss scaled by `recon_vs_gan_weight / (1 - recon_vs_gan_weight)`
    pub weighted_similarity_loss: Tensor,
    /// The pure generation `x_p`, decoded from the prior sample
    pub x_p: Tensor,
}

impl DecoderTrainOutput {
    /// Reconstruction realism probability in [0, 1]
    pub fn recon_score(&self) -> Tensor {
        self.recon_logits.sigmoid()
    }

    /// Generation realism probability in [0, 1]
    pub fn gen_score(&self) -> Tensor {
        self.gen_logits.sigmoid()
    }
}

/// Output of the discriminator training graph: (image, prior sample) ->
/// (real score, reconstruction score, generation score)
///
/// The reconstruction and generation images are detached inside this graph;
/// it trains only the discriminator, the training loop supplies the binary
/// cross-entropy targets.
#[derive(Debug)]
pub struct DiscriminatorTrainOutput {
    /// Realism logits for the real images
    pub real_logits: Tensor,
    /// Realism logits for the reconstructions
    pub recon_logits: Tensor,
    /// Realism logits for the pure generations
    pub gen_logits: Tensor,
}

impl DiscriminatorTrainOutput {
    /// Real-image realism probability in [0, 1]
    pub fn real_score(&self) -> Tensor {
        self.real_logits.sigmoid()
    }

    /// Reconstruction realism probability in [0, 1]
    pub fn recon_score(&self) -> Tensor {
        self.recon_logits.sigmoid()
    }

    /// Generation realism probability in [0, 1]
    pub fn gen_score(&self) -> Tensor {
        self.gen_logits.sigmoid()
    }
}

/// Complete VAE-GAN model
pub struct VaeGan {
    /// Encoder network
    pub encoder: Encoder,
    /// Decoder network (shared generator)
    pub decoder: Decoder,
    /// Discriminator network
    pub discriminator: Discriminator,
    /// Variable store for the encoder
    pub enc_vs: VarStore,
    /// Variable store for the decoder
    pub dec_vs: VarStore,
    /// Variable store for the discriminator
    pub disc_vs: VarStore,
    /// Device (CPU/GPU)
    pub device: Device,
    config: VaeGanConfig,
}

impl VaeGan {
    /// Create a new VAE-GAN model
    ///
    /// # Arguments
    ///
    /// * `config` - Model hyperparameters
    /// * `device` - Device to create the model on
    pub fn new(config: VaeGanConfig, device: Device) -> Self {
        let enc_vs = VarStore::new(device);
        let dec_vs = VarStore::new(device);
        let disc_vs = VarStore::new(device);

        let encoder = Encoder::new(
            &enc_vs.root(),
            EncoderConfig {
                in_channels: config.image_channels,
                image_size: config.image_size,
                latent_dim: config.latent_dim,
                bn_momentum: config.bn_momentum,
                bn_eps: config.bn_eps,
                ..Default::default()
            },
        );
        let decoder = Decoder::new(
            &dec_vs.root(),
            DecoderConfig {
                latent_dim: config.latent_dim,
                out_channels: config.image_channels,
                image_size: config.image_size,
                bn_momentum: config.bn_momentum,
                bn_eps: config.bn_eps,
                ..Default::default()
            },
        );
        let discriminator = Discriminator::new(
            &disc_vs.root(),
            DiscriminatorConfig {
                in_channels: config.image_channels,
                image_size: config.image_size,
                bn_momentum: config.bn_momentum,
                bn_eps: config.bn_eps,
                ..Default::default()
            },
        );

        Self {
            encoder,
            decoder,
            discriminator,
            enc_vs,
            dec_vs,
            disc_vs,
            device,
            config,
        }
    }

    /// Create a VAE-GAN with default hyperparameters
    pub fn with_defaults(device: Device) -> Self {
        Self::new(VaeGanConfig::default(), device)
    }

    /// Encode images into posterior parameters (inference mode)
    pub fn encode(&self, images: &Tensor) -> (Tensor, Tensor) {
        self.encoder.encode(images)
    }

    /// Decode latent vectors into images (inference mode)
    pub fn decode(&self, zs: &Tensor) -> Tensor {
        self.decoder.generate(zs)
    }

    /// Discriminate images (inference mode)
    ///
    /// Returns (realism probability, feature tensor)
    pub fn discriminate(&self, images: &Tensor) -> (Tensor, Tensor) {
        let (logits, features) = self.discriminator.forward_t(images, false);
        (logits.sigmoid(), features)
    }

    /// Inference composite: image -> reconstruction image
    pub fn reconstruct(&self, images: &Tensor) -> Tensor {
        let (z_mean, z_log_var) = self.encoder.forward_t(images, false);
        let z = sample_latent(&z_mean, &z_log_var);
        self.decoder.forward_t(&z, false)
    }

    /// Inference composite: image -> reconstruction realism probability
    pub fn reconstruction_score(&self, images: &Tensor) -> Tensor {
        let x_tilde = self.reconstruct(images);
        let (logits, _) = self.discriminator.forward_t(&x_tilde, false);
        logits.sigmoid()
    }

    /// Encoder training graph
    ///
    /// Runs image -> posterior -> latent sample -> reconstruction ->
    /// discriminator features, binding the KL and feature-similarity losses.
    /// Only the encoder optimizer consumes this objective; the other networks
    /// participate in the graph but stay frozen with respect to it.
    pub fn encoder_train_forward(&self, images: &Tensor, train: bool) -> EncoderTrainOutput {
        let (z_mean, z_log_var) = self.encoder.forward_t(images, train);
        let z = sample_latent(&z_mean, &z_log_var);
        let x_tilde = self.decoder.forward_t(&z, train);

        let (_, real_features) = self.discriminator.forward_t(images, train);
        let (_, recon_features) = self.discriminator.forward_t(&x_tilde, train);

        let kl_loss = kl_divergence(&z_mean, &z_log_var);
        let similarity_loss =
            mean_gaussian_negative_log_likelihood(&real_features, &recon_features);

        EncoderTrainOutput {
            recon_features,
            kl_loss,
            similarity_loss,
        }
    }

    /// Decoder training graph
    ///
    /// Maps (image, prior sample) to the realism logits of the reconstruction
    /// and the pure generation, binding the scaled feature-similarity loss.
    /// The adversarial part of the decoder objective is supplied externally
    /// by the training loop.
    pub fn decoder_train_forward(
        &self,
        images: &Tensor,
        z_p: &Tensor,
        train: bool,
    ) -> DecoderTrainOutput {
        let (z_mean, z_log_var) = self.encoder.forward_t(images, train);
        let z = sample_latent(&z_mean, &z_log_var);
        let x_tilde = self.decoder.forward_t(&z, train);
        let x_p = self.decoder.forward_t(z_p, train);

        let (_, real_features) = self.discriminator.forward_t(images, train);
        let (recon_logits, recon_features) = self.discriminator.forward_t(&x_tilde, train);
        let (gen_logits, _) = self.discriminator.forward_t(&x_p, train);

        let similarity_loss =
            mean_gaussian_negative_log_likelihood(&real_features, &recon_features);
        let weighted_similarity_loss = &similarity_loss * self.config.normalized_recon_weight();

        DecoderTrainOutput {
            recon_logits,
            gen_logits,
            similarity_loss,
            weighted_similarity_loss,
            x_p,
        }
    }

    /// Discriminator training graph
    ///
    /// Maps (image, prior sample) to realism logits for the real image, the
    /// reconstruction and the pure generation. The generated images are
    /// detached so the backward pass stops at the discriminator.
    pub fn discriminator_train_forward(
        &self,
        images: &Tensor,
        z_p: &Tensor,
        train: bool,
    ) -> DiscriminatorTrainOutput {
        let (z_mean, z_log_var) = self.encoder.forward_t(images, train);
        let z = sample_latent(&z_mean, &z_log_var);
        let x_tilde = self.decoder.forward_t(&z, train).detach();
        let x_p = self.decoder.forward_t(z_p, train).detach();

        let (real_logits, _) = self.discriminator.forward_t(images, train);
        let (recon_logits, _) = self.discriminator.forward_t(&x_tilde, train);
        let (gen_logits, _) = self.discriminator.forward_t(&x_p, train);

        DiscriminatorTrainOutput {
            real_logits,
            recon_logits,
            gen_logits,
        }
    }

    /// Get encoder optimizer (Adam with GAN betas and the configured weight decay)
    pub fn encoder_optimizer(&self, lr: f64) -> nn::Optimizer {
        self.build_optimizer(&self.enc_vs, lr, "encoder")
    }

    /// Get decoder optimizer
    pub fn decoder_optimizer(&self, lr: f64) -> nn::Optimizer {
        self.build_optimizer(&self.dec_vs, lr, "decoder")
    }

    /// Get discriminator optimizer
    pub fn discriminator_optimizer(&self, lr: f64) -> nn::Optimizer {
        self.build_optimizer(&self.disc_vs, lr, "discriminator")
    }

    fn build_optimizer(&self, vs: &VarStore, lr: f64, name: &str) -> nn::Optimizer {
        use tch::nn::OptimizerConfig;

        nn::Adam {
            beta1: 0.5,
            beta2: 0.999,
            wd: self.config.weight_decay,
        }
        .build(vs, lr)
        .unwrap_or_else(|e| panic!("Failed to create {name} optimizer: {e}"))
    }

    /// Save model weights
    pub fn save(&self, enc_path: &str, dec_path: &str, disc_path: &str) -> anyhow::Result<()> {
        self.enc_vs.save(enc_path)?;
        self.dec_vs.save(dec_path)?;
        self.disc_vs.save(disc_path)?;
        Ok(())
    }

    /// Load model weights
    pub fn load(
        &mut self,
        enc_path: &str,
        dec_path: &str,
        disc_path: &str,
    ) -> anyhow::Result<()> {
        self.enc_vs.load(enc_path)?;
        self.dec_vs.load(dec_path)?;
        self.disc_vs.load(disc_path)?;
        Ok(())
    }

    /// Get latent dimension
    pub fn latent_dim(&self) -> i64 {
        self.config.latent_dim
    }

    /// Get image size
    pub fn image_size(&self) -> i64 {
        self.config.image_size
    }

    /// Get configuration
    pub fn config(&self) -> &VaeGanConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sampler::sample_prior;
    use tch::Kind;

    fn in_unit_interval(t: &Tensor) -> bool {
        let min_val: f64 = t.min().double_value(&[]);
        let max_val: f64 = t.max().double_value(&[]);
        min_val >= 0.0 && max_val <= 1.0
    }

    #[test]
    fn test_vaegan_creation() {
        let model = VaeGan::with_defaults(Device::Cpu);

        assert_eq!(model.latent_dim(), 128);
        assert_eq!(model.image_size(), 64);
    }

    #[test]
    fn test_reconstruct_shape_and_range() {
        let model = VaeGan::with_defaults(Device::Cpu);

        let images = Tensor::randn([2, 3, 64, 64], (Kind::Float, Device::Cpu));
        let recon = model.reconstruct(&images);

        assert_eq!(recon.size(), vec![2, 3, 64, 64]);
        let min_val: f64 = recon.min().double_value(&[]);
        let max_val: f64 = recon.max().double_value(&[]);
        assert!(min_val >= -1.0 && max_val <= 1.0);
    }

    #[test]
    fn test_reconstruction_score_is_probability() {
        let model = VaeGan::with_defaults(Device::Cpu);

        let images = Tensor::randn([2, 3, 64, 64], (Kind::Float, Device::Cpu));
        let score = model.reconstruction_score(&images);

        assert_eq!(score.size(), vec![2, 1]);
        assert!(in_unit_interval(&score));
    }

    #[test]
    fn test_encoder_train_forward() {
        let model = VaeGan::with_defaults(Device::Cpu);

        let images = Tensor::randn([2, 3, 64, 64], (Kind::Float, Device::Cpu));
        let out = model.encoder_train_forward(&images, false);

        assert_eq!(out.recon_features.size(), vec![2, 256, 8, 8]);
        // bound losses are scalars
        assert_eq!(out.kl_loss.size(), Vec::<i64>::new());
        assert_eq!(out.similarity_loss.size(), Vec::<i64>::new());
        assert_eq!(out.total_loss().size(), Vec::<i64>::new());
    }

    #[test]
    fn test_discriminator_train_scores() {
        let model = VaeGan::with_defaults(Device::Cpu);

        let images = Tensor::randn([2, 3, 64, 64], (Kind::Float, Device::Cpu));
        let z_p = sample_prior(2, model.latent_dim(), Device::Cpu);
        let out = model.discriminator_train_forward(&images, &z_p, false);

        for score in [out.real_score(), out.recon_score(), out.gen_score()] {
            assert_eq!(score.size(), vec![2, 1]);
            assert!(in_unit_interval(&score));
        }
    }

    #[test]
    fn test_decoder_train_loss_scaling() {
        let config = VaeGanConfig {
            recon_vs_gan_weight: 0.25,
            ..Default::default()
        };
        let model = VaeGan::new(config, Device::Cpu);

        let images = Tensor::randn([2, 3, 64, 64], (Kind::Float, Device::Cpu));
        let z_p = sample_prior(2, model.latent_dim(), Device::Cpu);
        let out = model.decoder_train_forward(&images, &z_p, false);

        let similarity: f64 = out.similarity_loss.double_value(&[]);
        let weighted: f64 = out.weighted_similarity_loss.double_value(&[]);
        let expected = similarity * model.config().normalized_recon_weight();
        assert!((weighted - expected).abs() <= 1e-6 * expected.abs().max(1.0));

        for score in [out.recon_score(), out.gen_score()] {
            assert_eq!(score.size(), vec![2, 1]);
            assert!(in_unit_interval(&score));
        }
    }

    #[test]
    fn test_normalized_recon_weight() {
        let config = VaeGanConfig {
            recon_vs_gan_weight: 0.5,
            ..Default::default()
        };
        assert!((config.normalized_recon_weight() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_decoder_weights_shared_across_graphs() {
        let model = VaeGan::with_defaults(Device::Cpu);

        let images = Tensor::randn([2, 3, 64, 64], (Kind::Float, Device::Cpu));
        let z_p = sample_prior(2, model.latent_dim(), Device::Cpu);

        // In eval mode the decoder is deterministic, so the generation path of
        // the training graph must match the standalone decoder exactly.
        let out = model.decoder_train_forward(&images, &z_p, false);
        let direct = model.decode(&z_p);

        assert!(out.x_p.allclose(&direct, 1e-6, 1e-6, false));
    }
}
