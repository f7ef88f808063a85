//! # VAE-GAN for Images
//!
//! This crate provides a modular implementation of a VAE-GAN: a variational
//! autoencoder whose reconstruction loss is measured in the feature space of
//! a GAN discriminator instead of raw pixel space.
//!
//! The encoder, decoder and discriminator are each instantiated once and
//! shared by every composite graph, so training the three objectives never
//! duplicates weights.
//!
//! ## Modules
//!
//! - `data`: Image loading, normalization and batching
//! - `model`: Encoder, Decoder, Discriminator and the VaeGan wrapper
//! - `training`: Training loop, loss functions and metrics
//! - `utils`: Configuration and checkpointing

pub mod data;
pub mod model;
pub mod training;
pub mod utils;

pub use data::{denormalize_images, normalize_images, save_images, DataLoader, ImageDataset};
pub use model::{
    sample_latent, sample_prior, Decoder, Discriminator, Encoder, VaeGan, VaeGanConfig,
};
pub use training::{Trainer, TrainingConfig, TrainingMetrics};
pub use utils::{find_latest_checkpoint, load_checkpoint, save_checkpoint, Config};
