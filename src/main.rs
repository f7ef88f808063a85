//! VAE-GAN for Images
//!
//! Main entry point providing CLI interface for:
//! - Training the VAE-GAN model
//! - Reconstructing images through the VAE path
//! - Generating images from prior samples

use anyhow::Result;
use clap::{Parser, Subcommand};
use tch::Tensor;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use rust_vaegan::{
    data::{save_images, DataLoader, ImageDataset},
    model::{sample_prior, VaeGan},
    training::{Trainer, TrainingConfig},
    utils::{load_checkpoint, Config},
};

/// VAE-GAN for Images
#[derive(Parser)]
#[command(name = "vaegan")]
#[command(version = "0.1.0")]
#[command(about = "Train a VAE-GAN and generate images with it")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Verbosity level
    #[arg(short, long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the VAE-GAN model
    Train {
        /// Directory with training images
        #[arg(short, long)]
        data: String,

        /// Number of epochs
        #[arg(short, long, default_value = "100")]
        epochs: usize,

        /// Resume from checkpoint directory
        #[arg(long)]
        resume: Option<String>,
    },

    /// Reconstruct an image through the encoder/decoder path
    Reconstruct {
        /// Path to trained model checkpoint directory
        #[arg(short, long)]
        model: String,

        /// Input image path
        #[arg(short, long)]
        input: String,

        /// Output image path
        #[arg(short, long, default_value = "reconstruction.png")]
        output: String,
    },

    /// Generate images from prior samples
    Generate {
        /// Path to trained model checkpoint directory
        #[arg(short, long)]
        model: String,

        /// Number of images to generate
        #[arg(short, long, default_value = "16")]
        num_samples: i64,

        /// Output directory
        #[arg(short, long, default_value = "samples")]
        output: String,
    },

    /// Initialize default configuration file
    Init {
        /// Output configuration file path
        #[arg(short, long, default_value = "config.json")]
        output: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = match cli.verbosity.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Train {
            data,
            epochs,
            resume,
        } => {
            train_model(&cli.config, &data, epochs, resume)?;
        }
        Commands::Reconstruct {
            model,
            input,
            output,
        } => {
            reconstruct_image(&cli.config, &model, &input, &output)?;
        }
        Commands::Generate {
            model,
            num_samples,
            output,
        } => {
            generate_samples(&cli.config, &model, num_samples, &output)?;
        }
        Commands::Init { output } => {
            init_config(&output)?;
        }
    }

    Ok(())
}

/// Load configuration, falling back to defaults if the file is missing
fn load_config(config_path: &str) -> Result<Config> {
    let config = if std::path::Path::new(config_path).exists() {
        if config_path.ends_with(".toml") {
            Config::from_toml(config_path)?
        } else {
            Config::from_json(config_path)?
        }
    } else {
        info!("Config file not found, using defaults");
        Config::default()
    };
    config.validate()?;
    Ok(config)
}

/// Build a model and load checkpoint weights into it
fn load_model(config: &Config, checkpoint_dir: &str) -> Result<VaeGan> {
    let device = config.get_device();
    let mut model = VaeGan::new(config.vaegan_config(), device);
    let (epoch, _metrics) = load_checkpoint(&mut model, checkpoint_dir)?;
    info!("Loaded model from {} (epoch {})", checkpoint_dir, epoch);
    Ok(model)
}

/// Train the VAE-GAN model
fn train_model(
    config_path: &str,
    data_dir: &str,
    epochs: usize,
    resume: Option<String>,
) -> Result<()> {
    let config = load_config(config_path)?;

    let device = config.get_device();
    info!("Using device: {:?}", device);

    info!("Loading images from {}", data_dir);
    let dataset = ImageDataset::from_dir(data_dir, config.data.image_size)?;
    info!("Loaded {} images", dataset.len());

    if (dataset.len() as usize) < config.data.batch_size {
        anyhow::bail!(
            "Not enough images ({}) for batch size ({}). \
             Reduce batch_size or use more data.",
            dataset.len(),
            config.data.batch_size
        );
    }

    let mut data_loader = DataLoader::new(
        dataset.into_tensor(),
        config.data.batch_size,
        true, // shuffle
        true, // drop_last
    );

    info!(
        "DataLoader: {} batches of size {}",
        data_loader.num_batches(),
        config.data.batch_size
    );

    let mut model = VaeGan::new(config.vaegan_config(), device);

    if let Some(checkpoint_path) = resume {
        let (epoch, _metrics) = load_checkpoint(&mut model, &checkpoint_path)?;
        info!("Resumed from epoch {}", epoch);
    }

    let training_config = TrainingConfig {
        epochs,
        encoder_lr: config.training.encoder_lr,
        decoder_lr: config.training.decoder_lr,
        discriminator_lr: config.training.discriminator_lr,
        checkpoint_every: config.training.checkpoint_every,
        checkpoint_dir: config.training.checkpoint_dir.clone(),
    };

    let mut trainer = Trainer::new(training_config, device);

    info!("Starting training for {} epochs", epochs);
    let metrics = trainer.train(&mut model, &mut data_loader);

    info!(
        "Training complete. Final E_loss: {:.4}, De_loss: {:.4}, Di_loss: {:.4}",
        metrics.latest_encoder_loss().unwrap_or(0.0),
        metrics.latest_decoder_loss().unwrap_or(0.0),
        metrics.latest_discriminator_loss().unwrap_or(0.0)
    );

    Ok(())
}

/// Reconstruct a single image through the VAE path
fn reconstruct_image(
    config_path: &str,
    model_dir: &str,
    input_path: &str,
    output_path: &str,
) -> Result<()> {
    let config = load_config(config_path)?;
    let model = load_model(&config, model_dir)?;

    let image = tch::vision::image::load(input_path)?;
    let image = tch::vision::image::resize(&image, config.data.image_size, config.data.image_size)?;
    let batch = rust_vaegan::normalize_images(&image.unsqueeze(0)).to_device(model.device);

    let reconstruction = model.reconstruct(&batch);
    let score: f64 = model
        .reconstruction_score(&batch)
        .mean(tch::Kind::Float)
        .double_value(&[]);

    let pixels = rust_vaegan::denormalize_images(&reconstruction.to_device(tch::Device::Cpu));
    tch::vision::image::save(&pixels.get(0), output_path)?;

    info!(
        "Saved reconstruction to {} (realism score {:.4})",
        output_path, score
    );
    Ok(())
}

/// Generate images from prior samples
fn generate_samples(
    config_path: &str,
    model_dir: &str,
    num_samples: i64,
    output_dir: &str,
) -> Result<()> {
    let config = load_config(config_path)?;
    let model = load_model(&config, model_dir)?;

    info!("Generating {} images", num_samples);
    let z_p = sample_prior(num_samples, model.latent_dim(), model.device);
    let images: Tensor = model.decode(&z_p).to_device(tch::Device::Cpu);

    save_images(&images, output_dir, "sample")?;
    info!("Saved {} images to {}", num_samples, output_dir);

    Ok(())
}

/// Initialize default configuration file
fn init_config(output_path: &str) -> Result<()> {
    let config = Config::default();

    if output_path.ends_with(".toml") {
        config.save_toml(output_path)?;
    } else {
        config.save_json(output_path)?;
    }

    info!("Created default configuration at {}", output_path);
    Ok(())
}
