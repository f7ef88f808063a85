//! Training loop implementation for the VAE-GAN
//!
//! Provides the main training loop with alternating per-batch updates for the
//! discriminator, the decoder and the encoder. Each network has its own
//! optimizer over its own variable store, so every objective updates exactly
//! one network even though the forward graphs span all three.

use indicatif::{ProgressBar, ProgressStyle};
use tch::{Device, Kind, Tensor};
use tracing::{info, warn};

use crate::data::DataLoader;
use crate::model::{sample_prior, VaeGan};
use super::losses::{decoder_adversarial_loss, discriminator_adversarial_loss};
use super::metrics::TrainingMetrics;

/// Training configuration
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Number of training epochs
    pub epochs: usize,
    /// Learning rate for the encoder
    pub encoder_lr: f64,
    /// Learning rate for the decoder
    pub decoder_lr: f64,
    /// Learning rate for the discriminator
    pub discriminator_lr: f64,
    /// Save checkpoint every N epochs
    pub checkpoint_every: usize,
    /// Directory to save checkpoints
    pub checkpoint_dir: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            encoder_lr: 2e-4,
            decoder_lr: 2e-4,
            discriminator_lr: 2e-4,
            checkpoint_every: 10,
            checkpoint_dir: "checkpoints".to_string(),
        }
    }
}

/// VAE-GAN Trainer
pub struct Trainer {
    config: TrainingConfig,
    device: Device,
    metrics: TrainingMetrics,
}

impl Trainer {
    /// Create a new trainer
    pub fn new(config: TrainingConfig, device: Device) -> Self {
        Self {
            config,
            device,
            metrics: TrainingMetrics::new(),
        }
    }

    /// Train the VAE-GAN model
    ///
    /// # Arguments
    ///
    /// * `model` - VAE-GAN model to train
    /// * `data_loader` - DataLoader providing image batches
    ///
    /// # Returns
    ///
    /// Training metrics
    pub fn train(&mut self, model: &mut VaeGan, data_loader: &mut DataLoader) -> &TrainingMetrics {
        let mut enc_opt = model.encoder_optimizer(self.config.encoder_lr);
        let mut dec_opt = model.decoder_optimizer(self.config.decoder_lr);
        let mut disc_opt = model.discriminator_optimizer(self.config.discriminator_lr);

        let latent_dim = model.latent_dim();
        let num_batches = data_loader.num_batches();

        info!(
            "Starting training for {} epochs, {} batches per epoch",
            self.config.epochs, num_batches
        );

        std::fs::create_dir_all(&self.config.checkpoint_dir).ok();

        for epoch in 0..self.config.epochs {
            let mut epoch_enc_loss = 0.0;
            let mut epoch_dec_loss = 0.0;
            let mut epoch_disc_loss = 0.0;
            let mut epoch_real_acc = 0.0;
            let mut epoch_fake_acc = 0.0;
            let mut batch_count = 0;

            let pb = ProgressBar::new(num_batches as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                    .unwrap()
                    .progress_chars("##-"),
            );

            for real_batch in data_loader.iter() {
                let real_images = real_batch.to_device(self.device);
                let batch_size = real_images.size()[0];

                // ========== Train Discriminator ==========
                let z_p = sample_prior(batch_size, latent_dim, self.device);
                let disc_out = model.discriminator_train_forward(&real_images, &z_p, true);
                let d_loss = discriminator_adversarial_loss(
                    &disc_out.real_logits,
                    &disc_out.recon_logits,
                    &disc_out.gen_logits,
                );

                disc_opt.zero_grad();
                d_loss.backward();
                disc_opt.step();

                epoch_disc_loss += d_loss.double_value(&[]);

                let real_acc = disc_out
                    .real_score()
                    .ge(0.5)
                    .to_kind(Kind::Float)
                    .mean(Kind::Float);
                let fake_scores = Tensor::cat(&[disc_out.recon_score(), disc_out.gen_score()], 0);
                let fake_acc = fake_scores.lt(0.5).to_kind(Kind::Float).mean(Kind::Float);
                epoch_real_acc += real_acc.double_value(&[]);
                epoch_fake_acc += fake_acc.double_value(&[]);

                // ========== Train Decoder ==========
                let z_p = sample_prior(batch_size, latent_dim, self.device);
                let dec_out = model.decoder_train_forward(&real_images, &z_p, true);
                let g_loss = &dec_out.weighted_similarity_loss
                    + decoder_adversarial_loss(&dec_out.recon_logits, &dec_out.gen_logits);

                dec_opt.zero_grad();
                g_loss.backward();
                dec_opt.step();

                epoch_dec_loss += g_loss.double_value(&[]);

                // ========== Train Encoder ==========
                let enc_out = model.encoder_train_forward(&real_images, true);
                let e_loss = enc_out.total_loss();

                enc_opt.zero_grad();
                e_loss.backward();
                enc_opt.step();

                epoch_enc_loss += e_loss.double_value(&[]);
                batch_count += 1;

                pb.set_message(format!(
                    "E: {:.4}, De: {:.4}, Di: {:.4}",
                    e_loss.double_value(&[]),
                    g_loss.double_value(&[]),
                    epoch_disc_loss / batch_count as f64
                ));
                pb.inc(1);
            }

            pb.finish_with_message("done");

            let n = batch_count as f64;
            let avg_enc_loss = epoch_enc_loss / n;
            let avg_dec_loss = epoch_dec_loss / n;
            let avg_disc_loss = epoch_disc_loss / n;
            let avg_real_acc = epoch_real_acc / n;
            let avg_fake_acc = epoch_fake_acc / n;

            self.metrics.record_epoch(
                avg_enc_loss,
                avg_dec_loss,
                avg_disc_loss,
                avg_real_acc,
                avg_fake_acc,
            );

            info!(
                "Epoch {}/{}: E_loss={:.4}, De_loss={:.4}, Di_loss={:.4}, Real_acc={:.2}%, Fake_acc={:.2}%",
                epoch + 1,
                self.config.epochs,
                avg_enc_loss,
                avg_dec_loss,
                avg_disc_loss,
                avg_real_acc * 100.0,
                avg_fake_acc * 100.0
            );

            if self.metrics.check_mode_collapse(10) {
                warn!("Possible mode collapse detected! Consider adjusting learning rates.");
            }

            if (epoch + 1) % self.config.checkpoint_every == 0 {
                match crate::utils::save_checkpoint(model, &self.metrics, epoch + 1, &self.config.checkpoint_dir)
                {
                    Err(e) => warn!("Failed to save checkpoint: {}", e),
                    Ok(dir) => info!("Saved checkpoint to {}", dir),
                }
            }

            data_loader.reset();
        }

        // Save final model
        let enc_path = format!("{}/encoder_final.pt", self.config.checkpoint_dir);
        let dec_path = format!("{}/decoder_final.pt", self.config.checkpoint_dir);
        let disc_path = format!("{}/discriminator_final.pt", self.config.checkpoint_dir);
        if let Err(e) = model.save(&enc_path, &dec_path, &disc_path) {
            warn!("Failed to save final model: {}", e);
        }

        let metrics_path = format!("{}/training_metrics.csv", self.config.checkpoint_dir);
        if let Err(e) = self.metrics.save_csv(&metrics_path) {
            warn!("Failed to save metrics: {}", e);
        }

        &self.metrics
    }

    /// Get training metrics
    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    /// Get configuration
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }
}

/// Single training step (for more fine-grained control)
///
/// Runs one discriminator, decoder and encoder update on the given batch.
///
/// # Returns
///
/// Tuple of (encoder loss, decoder loss, discriminator loss)
pub fn train_step(
    model: &mut VaeGan,
    real_images: &Tensor,
    enc_opt: &mut tch::nn::Optimizer,
    dec_opt: &mut tch::nn::Optimizer,
    disc_opt: &mut tch::nn::Optimizer,
) -> (f64, f64, f64) {
    let batch_size = real_images.size()[0];
    let latent_dim = model.latent_dim();
    let device = model.device;

    // Discriminator update
    let z_p = sample_prior(batch_size, latent_dim, device);
    let disc_out = model.discriminator_train_forward(real_images, &z_p, true);
    let d_loss = discriminator_adversarial_loss(
        &disc_out.real_logits,
        &disc_out.recon_logits,
        &disc_out.gen_logits,
    );

    disc_opt.zero_grad();
    d_loss.backward();
    disc_opt.step();

    // Decoder update
    let z_p = sample_prior(batch_size, latent_dim, device);
    let dec_out = model.decoder_train_forward(real_images, &z_p, true);
    let g_loss = &dec_out.weighted_similarity_loss
        + decoder_adversarial_loss(&dec_out.recon_logits, &dec_out.gen_logits);

    dec_opt.zero_grad();
    g_loss.backward();
    dec_opt.step();

    // Encoder update
    let enc_out = model.encoder_train_forward(real_images, true);
    let e_loss = enc_out.total_loss();

    enc_opt.zero_grad();
    e_loss.backward();
    enc_opt.step();

    (
        e_loss.double_value(&[]),
        g_loss.double_value(&[]),
        d_loss.double_value(&[]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_config_default() {
        let config = TrainingConfig::default();
        assert_eq!(config.epochs, 100);
        assert_eq!(config.checkpoint_every, 10);
    }

    #[test]
    fn test_train_step_runs() {
        let mut model = VaeGan::with_defaults(Device::Cpu);
        let mut enc_opt = model.encoder_optimizer(2e-4);
        let mut dec_opt = model.decoder_optimizer(2e-4);
        let mut disc_opt = model.discriminator_optimizer(2e-4);

        let images = Tensor::randn([2, 3, 64, 64], (Kind::Float, Device::Cpu));
        let (e_loss, g_loss, d_loss) =
            train_step(&mut model, &images, &mut enc_opt, &mut dec_opt, &mut disc_opt);

        assert!(e_loss.is_finite());
        assert!(g_loss.is_finite());
        assert!(d_loss.is_finite());
    }
}
