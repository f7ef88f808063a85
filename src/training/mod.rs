//! Training module for the VAE-GAN
//!
//! This module provides:
//! - Training loop with alternating encoder/decoder/discriminator updates
//! - Loss functions (KL divergence, feature similarity, adversarial BCE)
//! - Training configuration and metrics

mod trainer;
pub mod losses;
mod metrics;

pub use trainer::{train_step, Trainer, TrainingConfig};
pub use losses::{
    decoder_adversarial_loss, discriminator_adversarial_loss, kl_divergence,
    mean_gaussian_negative_log_likelihood,
};
pub use metrics::TrainingMetrics;
