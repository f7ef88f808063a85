//! Training metrics for monitoring VAE-GAN progress
//!
//! Provides structures for tracking and logging training progress across the
//! three alternating objectives.

/// Metrics collected during training
#[derive(Debug, Clone, Default)]
pub struct TrainingMetrics {
    /// Encoder losses (KL + similarity) per epoch
    pub encoder_losses: Vec<f64>,
    /// Decoder losses (weighted similarity + adversarial) per epoch
    pub decoder_losses: Vec<f64>,
    /// Discriminator losses per epoch
    pub discriminator_losses: Vec<f64>,
    /// Discriminator accuracy on real images
    pub disc_real_acc: Vec<f64>,
    /// Discriminator accuracy on generated images (reconstructions and samples)
    pub disc_fake_acc: Vec<f64>,
}

impl TrainingMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record epoch metrics
    pub fn record_epoch(
        &mut self,
        encoder_loss: f64,
        decoder_loss: f64,
        discriminator_loss: f64,
        real_acc: f64,
        fake_acc: f64,
    ) {
        self.encoder_losses.push(encoder_loss);
        self.decoder_losses.push(decoder_loss);
        self.discriminator_losses.push(discriminator_loss);
        self.disc_real_acc.push(real_acc);
        self.disc_fake_acc.push(fake_acc);
    }

    /// Get number of recorded epochs
    pub fn num_epochs(&self) -> usize {
        self.encoder_losses.len()
    }

    /// Get latest encoder loss
    pub fn latest_encoder_loss(&self) -> Option<f64> {
        self.encoder_losses.last().copied()
    }

    /// Get latest decoder loss
    pub fn latest_decoder_loss(&self) -> Option<f64> {
        self.decoder_losses.last().copied()
    }

    /// Get latest discriminator loss
    pub fn latest_discriminator_loss(&self) -> Option<f64> {
        self.discriminator_losses.last().copied()
    }

    /// Calculate moving average of decoder loss
    pub fn decoder_loss_ma(&self, window: usize) -> f64 {
        moving_average(&self.decoder_losses, window)
    }

    /// Calculate moving average of discriminator loss
    pub fn discriminator_loss_ma(&self, window: usize) -> f64 {
        moving_average(&self.discriminator_losses, window)
    }

    /// Check if training appears to have collapsed
    ///
    /// Mode collapse indicators:
    /// - Discriminator loss very low (can easily distinguish)
    /// - Decoder loss very high (can't fool discriminator)
    pub fn check_mode_collapse(&self, window: usize) -> bool {
        if self.num_epochs() < window {
            return false;
        }

        let disc_ma = self.discriminator_loss_ma(window);
        let dec_ma = self.decoder_loss_ma(window);

        // Heuristic thresholds for mode collapse detection
        disc_ma < 0.1 && dec_ma > 5.0
    }

    /// Check if training is balanced
    ///
    /// Good training has discriminator accuracy around 50-70%
    pub fn is_balanced(&self, window: usize) -> bool {
        if self.num_epochs() < window {
            return true;
        }

        let recent_real: Vec<_> = self.disc_real_acc.iter().rev().take(window).copied().collect();
        let recent_fake: Vec<_> = self.disc_fake_acc.iter().rev().take(window).copied().collect();

        let avg_real: f64 = recent_real.iter().sum::<f64>() / recent_real.len() as f64;
        let avg_fake: f64 = recent_fake.iter().sum::<f64>() / recent_fake.len() as f64;

        (0.3..0.9).contains(&avg_real) && (0.3..0.9).contains(&avg_fake)
    }

    /// Save metrics to CSV file
    pub fn save_csv(&self, path: &str) -> anyhow::Result<()> {
        let mut writer = csv::Writer::from_path(path)?;

        writer.write_record([
            "epoch",
            "encoder_loss",
            "decoder_loss",
            "discriminator_loss",
            "real_acc",
            "fake_acc",
        ])?;

        for i in 0..self.num_epochs() {
            writer.write_record([
                (i + 1).to_string(),
                self.encoder_losses[i].to_string(),
                self.decoder_losses[i].to_string(),
                self.discriminator_losses[i].to_string(),
                self.disc_real_acc[i].to_string(),
                self.disc_fake_acc[i].to_string(),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Load metrics from CSV file
    pub fn load_csv(path: &str) -> anyhow::Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut metrics = Self::new();

        for result in reader.records() {
            let record = result?;
            metrics.encoder_losses.push(record[1].parse()?);
            metrics.decoder_losses.push(record[2].parse()?);
            metrics.discriminator_losses.push(record[3].parse()?);
            metrics.disc_real_acc.push(record[4].parse()?);
            metrics.disc_fake_acc.push(record[5].parse()?);
        }

        Ok(metrics)
    }
}

/// Calculate moving average of last `window` values
fn moving_average(values: &[f64], window: usize) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let n = window.min(values.len());
    let sum: f64 = values.iter().rev().take(n).sum();
    sum / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_metrics() {
        let mut metrics = TrainingMetrics::new();

        metrics.record_epoch(120.5, 1.5, 0.8, 0.6, 0.7);
        metrics.record_epoch(118.3, 1.3, 0.75, 0.65, 0.68);

        assert_eq!(metrics.num_epochs(), 2);
        assert_eq!(metrics.latest_encoder_loss(), Some(118.3));
        assert_eq!(metrics.latest_decoder_loss(), Some(1.3));
        assert_eq!(metrics.latest_discriminator_loss(), Some(0.75));
    }

    #[test]
    fn test_moving_average() {
        let mut metrics = TrainingMetrics::new();
        metrics.record_epoch(0.0, 1.0, 2.0, 0.5, 0.5);
        metrics.record_epoch(0.0, 3.0, 4.0, 0.5, 0.5);

        assert!((metrics.decoder_loss_ma(2) - 2.0).abs() < 1e-12);
        assert!((metrics.discriminator_loss_ma(1) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_mode_collapse_detection() {
        let mut metrics = TrainingMetrics::new();
        for _ in 0..10 {
            metrics.record_epoch(100.0, 8.0, 0.01, 0.99, 0.99);
        }
        assert!(metrics.check_mode_collapse(10));

        let mut healthy = TrainingMetrics::new();
        for _ in 0..10 {
            healthy.record_epoch(100.0, 1.2, 1.1, 0.6, 0.6);
        }
        assert!(!healthy.check_mode_collapse(10));
    }

    #[test]
    fn test_csv_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.csv");
        let path = path.to_str().unwrap();

        let mut metrics = TrainingMetrics::new();
        metrics.record_epoch(120.5, 1.5, 0.8, 0.6, 0.7);
        metrics.save_csv(path).unwrap();

        let loaded = TrainingMetrics::load_csv(path).unwrap();
        assert_eq!(loaded.num_epochs(), 1);
        assert_eq!(loaded.latest_encoder_loss(), Some(120.5));
    }
}
