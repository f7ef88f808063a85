//! Data module for loading and preprocessing training images
//!
//! This module provides:
//! - Image directory loading and [-1, 1] normalization
//! - DataLoader for batching images

mod dataset;
mod loader;

pub use dataset::{denormalize_images, normalize_images, save_images, ImageDataset};
pub use loader::DataLoader;
