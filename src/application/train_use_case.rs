// ============================================================
// Layer 2 - TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load the train split       (Layer 4 - data)
//   Step 2: Split train/validation     (Layer 4 - data)
//   Step 3: Fit the normaliser         (Layer 4 - data)
//   Step 4: Build datasets             (Layer 4 - data)
//   Step 5: Save config + normaliser   (Layer 6 - infra)
//   Step 6: Run training loop          (Layer 5 - ml)

use anyhow::{Context, Result};
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::MnistDataset,
    preprocessor::Normalizer,
    splitter::split_train_val,
};
use crate::domain::{image::{LabeledImage, Split}, traits::ImageSource};
use crate::infra::{checkpoint::CheckpointManager, metrics::{EpochMetrics, MetricsLogger}};
use crate::ml::{
    model::CnnConfig,
    trainer::{train_loop, OptimizerKind, TrainContext},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All settings for one training run. Saved as train_config.json
// next to the weights; `model` is what evaluation needs to rebuild
// the architecture before loading them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_dir:       String,
    pub checkpoint_dir: String,
    pub epochs:         usize,
    pub batch_size:     usize,
    pub lr:             f64,
    pub optimizer:      OptimizerKind,
    /// Fraction of the train split held out for validation
    pub val_fraction:   f64,
    pub seed:           u64,
    pub num_workers:    usize,
    pub model:          CnnConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:       "data/mnist".to_string(),
            checkpoint_dir: "checkpoints".to_string(),
            epochs:         3,
            batch_size:     512,
            lr:             0.4,
            optimizer:      OptimizerKind::Sgd,
            val_fraction:   0.1,
            seed:           42,
            num_workers:    2,
            model:          CnnConfig::mnist(vec![8, 16, 32, 32]),
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        self.model.validate().context("Invalid model configuration")?;
        anyhow::ensure!(self.batch_size > 0, "batch_size must be at least 1");
        anyhow::ensure!(self.epochs > 0, "epochs must be at least 1");
        anyhow::ensure!(
            self.val_fraction > 0.0 && self.val_fraction < 1.0,
            "val_fraction must be in (0, 1), got {}",
            self.val_fraction
        );
        Ok(())
    }
}

pub struct TrainUseCase<B: AutodiffBackend, S: ImageSource> {
    config: TrainConfig,
    source: S,
    device: B::Device,
}

impl<B: AutodiffBackend, S: ImageSource> TrainUseCase<B, S> {
    pub fn new(config: TrainConfig, source: S, device: B::Device) -> Self {
        Self { config, source, device }
    }

    pub fn execute(&self) -> Result<Vec<EpochMetrics>> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 1: Load the training images ─────────────────────────────────
        tracing::info!("Loading training images from '{}'", cfg.data_dir);
        let images = self.source.load(Split::Train)?;
        anyhow::ensure!(!images.is_empty(), "No training images found in '{}'", cfg.data_dir);
        check_image_shape(&cfg.model, images[0].width, images[0].height, images[0].pixel_count())?;
        check_labels(&cfg.model, &images)?;

        // ── Step 2 + 3: Hold out validation, fit statistics on the rest ──────
        // Fitting after the split keeps validation images out of the statistics.
        let (train_images, val_images) = split_train_val(images, 1.0 - cfg.val_fraction, cfg.seed);
        tracing::info!("Split: {} train, {} validation", train_images.len(), val_images.len());
        anyhow::ensure!(
            !train_images.is_empty() && !val_images.is_empty(),
            "Cannot split {} images into non-empty train and validation sets with val_fraction={}",
            train_images.len() + val_images.len(),
            cfg.val_fraction
        );
        let normalizer = Normalizer::fit(&train_images);

        // ── Step 4: Build Burn datasets ───────────────────────────────────────
        let train_dataset = MnistDataset::new(normalizer.apply_all(&train_images));
        let val_dataset   = MnistDataset::new(normalizer.apply_all(&val_images));

        // ── Step 5: Save what evaluation needs to reproduce the inputs ───────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt_manager.save_config(cfg)?;
        ckpt_manager.save_normalizer(&normalizer)?;
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;

        // ── Step 6: Run training loop (Layer 5) ───────────────────────────────
        tracing::info!("Using device: {:?}", self.device);
        let history = train_loop::<B>(TrainContext {
            cfg,
            train_dataset,
            val_dataset,
            ckpt:    &ckpt_manager,
            metrics: &metrics,
            device:  self.device.clone(),
        })?;
        tracing::info!("Epoch metrics written to '{}'", metrics.csv_path().display());
        Ok(history)
    }
}

/// Images must match the architecture the model reshapes flat rows into.
pub fn check_image_shape(model: &CnnConfig, width: usize, height: usize, pixels: usize) -> Result<()> {
    anyhow::ensure!(
        width == model.size_in && height == model.size_in && model.channel_in == 1,
        "Images are {width}x{height} greyscale, but the model expects {0}x{0} with {1} channel(s)",
        model.size_in,
        model.channel_in,
    );
    anyhow::ensure!(
        pixels == model.input_width(),
        "Image has {pixels} pixels, model expects {}",
        model.input_width()
    );
    Ok(())
}

/// Every label must index one of the model's output classes.
pub fn check_labels(model: &CnnConfig, images: &[LabeledImage]) -> Result<()> {
    if let Some((i, img)) = images
        .iter()
        .enumerate()
        .find(|(_, img)| img.label as usize >= model.channel_out)
    {
        anyhow::bail!(
            "Image #{i} has label {}, but the model only has {} output classes",
            img.label,
            model.channel_out
        );
    }
    Ok(())
}
