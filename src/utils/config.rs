//! Configuration management
//!
//! Provides unified configuration for the entire VAE-GAN pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::model::VaeGanConfig;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data configuration
    pub data: DataConfig,
    /// Model configuration
    pub model: ModelConfig,
    /// Training configuration
    pub training: TrainingConfigFile,
}

/// Data-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory containing training images
    pub image_dir: String,
    /// Height/width images are resized to
    pub image_size: i64,
    /// Batch size
    pub batch_size: usize,
}

/// Model-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Latent dimension size
    pub latent_dim: i64,
    /// Number of image channels (3 for RGB)
    pub image_channels: i64,
    /// Weight of the feature-similarity loss against the adversarial loss
    /// in the decoder objective; must lie in (0, 1) exclusive
    pub recon_vs_gan_weight: f64,
    /// L2 weight decay applied through the optimizers
    pub weight_decay: f64,
    /// Running-average decay for batch normalization
    pub bn_momentum: f64,
    /// Batch normalization epsilon
    pub bn_eps: f64,
}

/// Training-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfigFile {
    /// Number of epochs
    pub epochs: usize,
    /// Encoder learning rate
    pub encoder_lr: f64,
    /// Decoder learning rate
    pub decoder_lr: f64,
    /// Discriminator learning rate
    pub discriminator_lr: f64,
    /// Checkpoint save frequency
    pub checkpoint_every: usize,
    /// Checkpoint directory
    pub checkpoint_dir: String,
    /// Device: "cpu" or "cuda"
    pub device: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig {
                image_dir: "data/images".to_string(),
                image_size: 64,
                batch_size: 64,
            },
            model: ModelConfig {
                latent_dim: 128,
                image_channels: 3,
                recon_vs_gan_weight: 1e-6,
                weight_decay: 1e-5,
                bn_momentum: 0.9,
                bn_eps: 1e-6,
            },
            training: TrainingConfigFile {
                epochs: 100,
                encoder_lr: 2e-4,
                decoder_lr: 2e-4,
                discriminator_lr: 2e-4,
                checkpoint_every: 10,
                checkpoint_dir: "checkpoints".to_string(),
                device: "cpu".to_string(),
            },
        }
    }
}

impl Config {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from TOML file
    pub fn from_toml(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_toml(&self, path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from JSON file
    pub fn from_json(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn save_json(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get device from configuration
    pub fn get_device(&self) -> tch::Device {
        match self.training.device.to_lowercase().as_str() {
            "cuda" | "gpu" => {
                if tch::Cuda::is_available() {
                    tch::Device::Cuda(0)
                } else {
                    tracing::warn!("CUDA requested but not available, falling back to CPU");
                    tch::Device::Cpu
                }
            }
            _ => tch::Device::Cpu,
        }
    }

    /// Build the model hyperparameters from this configuration
    pub fn vaegan_config(&self) -> VaeGanConfig {
        VaeGanConfig {
            latent_dim: self.model.latent_dim,
            image_size: self.data.image_size,
            image_channels: self.model.image_channels,
            recon_vs_gan_weight: self.model.recon_vs_gan_weight,
            weight_decay: self.model.weight_decay,
            bn_momentum: self.model.bn_momentum,
            bn_eps: self.model.bn_eps,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.data.batch_size == 0 {
            anyhow::bail!("Batch size must be > 0");
        }
        if self.data.image_size < 8 || self.data.image_size % 8 != 0 {
            anyhow::bail!("Image size must be a positive multiple of 8");
        }
        if self.model.latent_dim <= 0 {
            anyhow::bail!("Latent dimension must be > 0");
        }
        if self.model.recon_vs_gan_weight <= 0.0 || self.model.recon_vs_gan_weight >= 1.0 {
            anyhow::bail!(
                "recon_vs_gan_weight must lie strictly between 0 and 1 \
                 (a value of 1 makes the loss normalization divide by zero)"
            );
        }
        if self.training.epochs == 0 {
            anyhow::bail!("Number of epochs must be > 0");
        }
        Ok(())
    }
}

/// Create default configuration file if it doesn't exist
pub fn ensure_config_exists(path: &str) -> anyhow::Result<Config> {
    if Path::new(path).exists() {
        if path.ends_with(".toml") {
            Config::from_toml(path)
        } else {
            Config::from_json(path)
        }
    } else {
        let config = Config::default();
        if path.ends_with(".toml") {
            config.save_toml(path)?;
        } else {
            config.save_json(path)?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.model.latent_dim, 128);
        assert_eq!(config.data.image_size, 64);
        assert_eq!(config.model.recon_vs_gan_weight, 1e-6);
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let loaded: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(config.data.image_dir, loaded.data.image_dir);
        assert_eq!(config.model.latent_dim, loaded.model.latent_dim);
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();

        let config = Config::default();
        config.save_toml(path).unwrap();
        let loaded = Config::from_toml(path).unwrap();

        assert_eq!(config.training.epochs, loaded.training.epochs);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.data.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_degenerate_recon_weight() {
        let mut config = Config::default();

        config.model.recon_vs_gan_weight = 1.0;
        assert!(config.validate().is_err());

        config.model.recon_vs_gan_weight = 0.0;
        assert!(config.validate().is_err());

        config.model.recon_vs_gan_weight = 0.5;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_vaegan_config_mapping() {
        let config = Config::default();
        let model_config = config.vaegan_config();

        assert_eq!(model_config.latent_dim, 128);
        assert_eq!(model_config.image_size, 64);
        assert_eq!(model_config.recon_vs_gan_weight, 1e-6);
    }
}
