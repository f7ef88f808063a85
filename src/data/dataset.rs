//! Image dataset loading and normalization
//!
//! This module provides functions for:
//! - Loading a directory of images into a single tensor
//! - Normalizing pixel data to the [-1, 1] range (required for a tanh generator)
//! - Converting model output back to savable 8-bit images

use std::path::Path;

use anyhow::{Context, Result};
use tch::{Kind, Tensor};

/// Dataset of images held as one float tensor in [-1, 1]
#[derive(Debug)]
pub struct ImageDataset {
    /// Tensor of shape (num_images, channels, height, width)
    images: Tensor,
}

impl ImageDataset {
    /// Load every image in a directory, resized to `image_size` x `image_size`
    ///
    /// # Arguments
    ///
    /// * `dir` - Directory containing image files
    /// * `image_size` - Target height/width
    pub fn from_dir<P: AsRef<Path>>(dir: P, image_size: i64) -> Result<Self> {
        let dir = dir.as_ref();
        let raw = tch::vision::image::load_dir(dir, image_size, image_size)
            .with_context(|| format!("Failed to load images from {}", dir.display()))?;
        Ok(Self {
            images: normalize_images(&raw),
        })
    }

    /// Wrap an already-normalized image tensor of shape (N, C, H, W)
    pub fn from_tensor(images: Tensor) -> Self {
        Self { images }
    }

    /// Number of images
    pub fn len(&self) -> i64 {
        self.images.size()[0]
    }

    /// Check if the dataset is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the underlying image tensor
    pub fn images(&self) -> &Tensor {
        &self.images
    }

    /// Consume the dataset, returning the image tensor
    pub fn into_tensor(self) -> Tensor {
        self.images
    }
}

/// Normalize 8-bit pixel data to [-1, 1]
///
/// Formula: x_norm = x / 127.5 - 1
pub fn normalize_images(raw: &Tensor) -> Tensor {
    raw.to_kind(Kind::Float) / 127.5 - 1.0
}

/// Convert [-1, 1] image data back to 8-bit pixels
///
/// Formula: x = (x_norm + 1) * 127.5, clamped to [0, 255]
pub fn denormalize_images(images: &Tensor) -> Tensor {
    ((images + 1.0) * 127.5).clamp(0.0, 255.0).to_kind(Kind::Uint8)
}

/// Save a batch of [-1, 1] images as PNG files `prefix_0.png`, `prefix_1.png`, ...
///
/// # Arguments
///
/// * `images` - Tensor of shape (N, C, H, W) with values in [-1, 1]
/// * `dir` - Output directory (created if missing)
/// * `prefix` - File name prefix
pub fn save_images<P: AsRef<Path>>(images: &Tensor, dir: P, prefix: &str) -> Result<()> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let pixels = denormalize_images(images);
    for i in 0..pixels.size()[0] {
        let path = dir.join(format!("{}_{}.png", prefix, i));
        tch::vision::image::save(&pixels.get(i), &path)
            .with_context(|| format!("Failed to save image to {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::Device;

    #[test]
    fn test_normalize_range() {
        let raw = Tensor::from_slice(&[0u8, 128, 255]).view([1, 3, 1, 1]);
        let normalized = normalize_images(&raw);

        let min_val: f64 = normalized.min().double_value(&[]);
        let max_val: f64 = normalized.max().double_value(&[]);
        assert!(min_val >= -1.0 && max_val <= 1.0);
        assert!((min_val + 1.0).abs() < 1e-6);
        assert!((max_val - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_denormalize_roundtrip() {
        let raw = Tensor::randint(256, [2, 3, 8, 8], (Kind::Uint8, Device::Cpu));
        let recovered = denormalize_images(&normalize_images(&raw));

        assert_eq!(recovered.size(), raw.size());
        let diff: f64 = (recovered.to_kind(Kind::Float) - raw.to_kind(Kind::Float))
            .abs()
            .max()
            .double_value(&[]);
        assert!(diff < 1.0);
    }

    #[test]
    fn test_dataset_from_tensor() {
        let images = Tensor::zeros([5, 3, 64, 64], (Kind::Float, Device::Cpu));
        let dataset = ImageDataset::from_tensor(images);

        assert_eq!(dataset.len(), 5);
        assert!(!dataset.is_empty());
        assert_eq!(dataset.images().size(), vec![5, 3, 64, 64]);
    }
}
