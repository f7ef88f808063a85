//! Latent sampling for the VAE-GAN
//!
//! Implements the reparameterization trick: instead of sampling from
//! Q(z|x) directly, sample eps ~ N(0, I) and return
//! `z = z_mean + exp(0.5 * z_log_var) * eps`.

use tch::{Device, Kind, Tensor};

/// Draw a latent sample from N(z_mean, exp(z_log_var) * I).
///
/// Gradients flow through `z_mean` and `z_log_var` only: the noise comes from
/// `randn_like`, a fresh leaf tensor with no gradient path.
///
/// # Arguments
///
/// * `z_mean` - Posterior mean of shape (batch_size, latent_dim)
/// * `z_log_var` - Posterior log-variance, same shape
///
/// # Returns
///
/// Latent sample `z` of shape (batch_size, latent_dim)
pub fn sample_latent(z_mean: &Tensor, z_log_var: &Tensor) -> Tensor {
    let std = (z_log_var * 0.5).exp();
    let epsilon = Tensor::randn_like(z_mean);
    z_mean + std * epsilon
}

/// Draw `batch_size` samples from the standard normal prior N(0, I).
pub fn sample_prior(batch_size: i64, latent_dim: i64, device: Device) -> Tensor {
    Tensor::randn([batch_size, latent_dim], (Kind::Float, device))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_latent_shape() {
        let z_mean = Tensor::zeros([4, 128], (Kind::Float, Device::Cpu));
        let z_log_var = Tensor::zeros([4, 128], (Kind::Float, Device::Cpu));

        let z = sample_latent(&z_mean, &z_log_var);
        assert_eq!(z.size(), vec![4, 128]);
    }

    #[test]
    fn test_sample_latent_collapses_to_mean() {
        // exp(0.5 * -100) is numerically zero, so the sample is the mean
        let z_mean = Tensor::randn([4, 128], (Kind::Float, Device::Cpu));
        let z_log_var = Tensor::full([4, 128], -100.0, (Kind::Float, Device::Cpu));

        let z = sample_latent(&z_mean, &z_log_var);
        assert!(z.allclose(&z_mean, 1e-6, 1e-6, false));
    }

    #[test]
    fn test_sample_prior_shape() {
        let z_p = sample_prior(8, 128, Device::Cpu);
        assert_eq!(z_p.size(), vec![8, 128]);
    }
}
