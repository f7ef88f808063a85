//! Loss functions for VAE-GAN training
//!
//! Implements the KL divergence against the standard normal prior, the
//! learned feature-similarity metric (unit-variance Gaussian negative
//! log-likelihood), and the binary cross-entropy terms of the adversarial
//! game.

use tch::{Kind, Tensor};

/// KL divergence between the approximate posterior N(z_mean, exp(z_log_var))
/// and the standard normal prior
///
/// `mean(-0.5 * sum(1 + z_log_var - z_mean^2 - exp(z_log_var), latent axis))`,
/// averaged over the batch.
///
/// # Arguments
///
/// * `z_mean` - Posterior means of shape (batch_size, latent_dim)
/// * `z_log_var` - Posterior log-variances, same shape
///
/// # Returns
///
/// Scalar loss tensor
pub fn kl_divergence(z_mean: &Tensor, z_log_var: &Tensor) -> Tensor {
    let batch_size = z_mean.size()[0] as f64;
    let total = (z_log_var + 1.0 - z_mean.pow_tensor_scalar(2) - z_log_var.exp())
        .sum(Kind::Float);
    total * (-0.5 / batch_size)
}

/// Gaussian negative log-likelihood between two equal-shaped tensors
///
/// Treats `pred` as the mean of a unit-variance Gaussian over `target`:
/// `0.5 * ln(2*pi) + 0.5 * (pred - target)^2`, summed over all feature axes
/// and averaged over the batch. Symmetric in its arguments and growing with
/// feature distance.
///
/// # Arguments
///
/// * `target` - Tensor whose first axis is the batch
/// * `pred` - Tensor of the same shape
///
/// # Returns
///
/// Scalar loss tensor
pub fn mean_gaussian_negative_log_likelihood(target: &Tensor, pred: &Tensor) -> Tensor {
    let batch_size = target.size()[0] as f64;
    let half_log_two_pi = 0.5 * (2.0 * std::f64::consts::PI).ln();
    let nll = (pred - target).pow_tensor_scalar(2) * 0.5 + half_log_two_pi;
    nll.sum(Kind::Float) * (1.0 / batch_size)
}

/// Adversarial loss against the "real" label (1)
///
/// # Arguments
///
/// * `logits` - Discriminator output logits
///
/// # Returns
///
/// Scalar loss tensor
pub fn adversarial_real_loss(logits: &Tensor) -> Tensor {
    let targets = Tensor::ones_like(logits);
    logits.binary_cross_entropy_with_logits::<Tensor>(
        &targets,
        None,
        None,
        tch::Reduction::Mean,
    )
}

/// Adversarial loss against the "fake" label (0)
pub fn adversarial_fake_loss(logits: &Tensor) -> Tensor {
    let targets = Tensor::zeros_like(logits);
    logits.binary_cross_entropy_with_logits::<Tensor>(
        &targets,
        None,
        None,
        tch::Reduction::Mean,
    )
}

/// Decoder adversarial loss: the decoder wants both the reconstruction and
/// the pure generation classified as real
pub fn decoder_adversarial_loss(recon_logits: &Tensor, gen_logits: &Tensor) -> Tensor {
    adversarial_real_loss(recon_logits) + adversarial_real_loss(gen_logits)
}

/// Discriminator adversarial loss: real images toward 1, reconstructions and
/// pure generations toward 0
pub fn discriminator_adversarial_loss(
    real_logits: &Tensor,
    recon_logits: &Tensor,
    gen_logits: &Tensor,
) -> Tensor {
    adversarial_real_loss(real_logits)
        + adversarial_fake_loss(recon_logits)
        + adversarial_fake_loss(gen_logits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::Device;

    #[test]
    fn test_kl_divergence_zero_at_prior() {
        // z_mean == 0 and z_log_var == 0 is exactly the prior
        let z_mean = Tensor::zeros([4, 128], (Kind::Float, Device::Cpu));
        let z_log_var = Tensor::zeros([4, 128], (Kind::Float, Device::Cpu));

        let kl = kl_divergence(&z_mean, &z_log_var);
        assert_eq!(kl.size(), Vec::<i64>::new());
        assert!(kl.double_value(&[]).abs() < 1e-6);
    }

    #[test]
    fn test_kl_divergence_positive_off_prior() {
        let z_mean = Tensor::full(&[4, 128], 1.0, (Kind::Float, Device::Cpu));
        let z_log_var = Tensor::zeros([4, 128], (Kind::Float, Device::Cpu));

        // KL = 0.5 * sum(mean^2) per sample = 0.5 * 128
        let kl = kl_divergence(&z_mean, &z_log_var).double_value(&[]);
        assert!((kl - 64.0).abs() < 1e-3);
    }

    #[test]
    fn test_gaussian_nll_at_zero_distance() {
        let a = Tensor::randn([4, 16], (Kind::Float, Device::Cpu));

        // At zero distance only the constant term remains: D * 0.5 * ln(2*pi)
        let nll = mean_gaussian_negative_log_likelihood(&a, &a).double_value(&[]);
        let expected = 16.0 * 0.5 * (2.0 * std::f64::consts::PI).ln();
        assert!((nll - expected).abs() < 1e-3);
    }

    #[test]
    fn test_gaussian_nll_grows_with_distance() {
        let a = Tensor::zeros([4, 16], (Kind::Float, Device::Cpu));
        let near = Tensor::full(&[4, 16], 0.1, (Kind::Float, Device::Cpu));
        let far = Tensor::full(&[4, 16], 1.0, (Kind::Float, Device::Cpu));

        let nll_near = mean_gaussian_negative_log_likelihood(&a, &near).double_value(&[]);
        let nll_far = mean_gaussian_negative_log_likelihood(&a, &far).double_value(&[]);
        assert!(nll_far > nll_near);
    }

    #[test]
    fn test_decoder_adversarial_loss() {
        let recon = Tensor::randn([4, 1], (Kind::Float, Device::Cpu));
        let gen = Tensor::randn([4, 1], (Kind::Float, Device::Cpu));
        let loss = decoder_adversarial_loss(&recon, &gen);

        assert_eq!(loss.size(), Vec::<i64>::new());
        assert!(loss.double_value(&[]) > 0.0);
    }

    #[test]
    fn test_perfect_discriminator() {
        // High confidence on real, low on both fakes
        let real = Tensor::full(&[4, 1], 10.0, (Kind::Float, Device::Cpu));
        let recon = Tensor::full(&[4, 1], -10.0, (Kind::Float, Device::Cpu));
        let gen = Tensor::full(&[4, 1], -10.0, (Kind::Float, Device::Cpu));

        let loss = discriminator_adversarial_loss(&real, &recon, &gen);
        assert!(loss.double_value(&[]) < 0.1);
    }
}
